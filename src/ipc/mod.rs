use serde_derive::Serialize;
use std::{net::SocketAddr, str, time::Duration};
use tokio::net::{lookup_host, UdpSocket};

use crate::error::{Error, Result};
use crate::solver::Polynomial;

pub mod reply;

/* 1データグラムの最大長 */
pub const MAX_DATAGRAM: usize = 1024;

/* %lf と同じ小数点以下6桁 */
pub const FRACTION_DIGITS: usize = 6;

/* 受信したデータグラムの解釈結果。decode は必ずこのどれかを返す */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Request {
    Quadratic { a: f64, b: f64, c: f64 },
    Cubic { a: f64, b: f64, c: f64, d: f64 },
    Malformed(Malformed),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Malformed {
    NotUtf8,
    TokenCount(usize),
    NotANumber(String),
    NotFinite(String),
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::NotUtf8 => write!(f, "payload is not UTF-8"),
            Malformed::TokenCount(n) => write!(f, "expected 3 or 4 coefficients, got {n}"),
            Malformed::NotANumber(token) => write!(f, "{token:?} is not a number"),
            Malformed::NotFinite(token) => write!(f, "{token:?} is not finite"),
        }
    }
}

impl Request {
    /* 解くべき多項式。不正な要求なら破棄理由を返す */
    pub fn into_polynomial(self) -> std::result::Result<Polynomial, Malformed> {
        match self {
            Request::Quadratic { a, b, c } => Ok(Polynomial::Quadratic { a, b, c }),
            Request::Cubic { a, b, c, d } => Ok(Polynomial::Cubic { a, b, c, d }),
            Request::Malformed(reason) => Err(reason),
        }
    }
}

impl From<Polynomial> for Request {
    fn from(polynomial: Polynomial) -> Self {
        match polynomial {
            Polynomial::Quadratic { a, b, c } => Request::Quadratic { a, b, c },
            Polynomial::Cubic { a, b, c, d } => Request::Cubic { a, b, c, d },
        }
    }
}

/* 係数を空白区切りの文字列にする。末尾に区切り文字は付けない */
pub fn encode(polynomial: &Polynomial) -> String {
    polynomial
        .coefficients()
        .iter()
        .map(|coefficient| format!("{:.*}", FRACTION_DIGITS, coefficient))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode(payload: &[u8]) -> Request {
    let text = match str::from_utf8(payload) {
        Ok(text) => text,
        Err(_) => return Request::Malformed(Malformed::NotUtf8),
    };

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 3 && tokens.len() != 4 {
        return Request::Malformed(Malformed::TokenCount(tokens.len()));
    }

    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => values.push(value),
            Ok(_) => return Request::Malformed(Malformed::NotFinite(token.to_string())),
            Err(_) => return Request::Malformed(Malformed::NotANumber(token.to_string())),
        }
    }

    match values[..] {
        [a, b, c] => Request::Quadratic { a, b, c },
        [a, b, c, d] => Request::Cubic { a, b, c, d },
        _ => Request::Malformed(Malformed::TokenCount(values.len())),
    }
}

pub async fn resolve(addr: &str) -> Result<SocketAddr> {
    let mut candidates = lookup_host(addr).await.map_err(|source| Error::Resolve {
        addr: addr.to_string(),
        source,
    })?;
    candidates.next().ok_or_else(|| Error::Resolve {
        addr: addr.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address"),
    })
}

/* UDPソケットの送受信をまとめたハンドラ */
pub struct UdpMessageHandler {
    socket: UdpSocket,
}

impl UdpMessageHandler {
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(UdpMessageHandler { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Error::Receive)
    }

    /*
        データグラムを1つ受信する。
        deadline が指定されていれば、その時間内に届かない場合 None を返す
    */
    pub async fn recv_datagram(
        &self,
        deadline: Option<Duration>,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buffer = [0u8; MAX_DATAGRAM];

        let received = match deadline {
            Some(window) => {
                match tokio::time::timeout(window, self.socket.recv_from(&mut buffer)).await {
                    Ok(received) => received,
                    Err(_) => return Ok(None),
                }
            }
            None => self.socket.recv_from(&mut buffer).await,
        };

        let (n, src_addr) = received.map_err(Error::Receive)?;
        Ok(Some((buffer[..n].to_vec(), src_addr)))
    }

    pub async fn send_text(&self, text: &str, dst_addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(text.as_bytes(), dst_addr)
            .await
            .map_err(|source| Error::Send {
                dst: dst_addr,
                source,
            })?;
        Ok(())
    }
}

pub fn display_request(request: &Request) -> String {
    match request {
        Request::Quadratic { a, b, c } => format!("quadratic {a}x^2 + {b}x + {c} = 0"),
        Request::Cubic { a, b, c, d } => format!("cubic {a}x^3 + {b}x^2 + {c}x + {d} = 0"),
        Request::Malformed(reason) => format!("malformed ({reason})"),
    }
}
