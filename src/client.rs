use std::{net::SocketAddr, time::Duration};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ipc::{self, Request, UdpMessageHandler};
use crate::solver::Polynomial;

/* コマンドラインの係数列から多項式を作る。個数で二次か三次かが決まる */
pub fn polynomial_from(coefficients: &[f64]) -> Result<Polynomial> {
    if let Some(bad) = coefficients.iter().find(|x| !x.is_finite()) {
        return Err(Error::Coefficients(format!("{bad} is not finite")));
    }
    match *coefficients {
        [a, b, c] => Ok(Polynomial::Quadratic { a, b, c }),
        [a, b, c, d] => Ok(Polynomial::Cubic { a, b, c, d }),
        _ => Err(Error::Coefficients(format!(
            "expected 3 or 4 coefficients, got {}",
            coefficients.len()
        ))),
    }
}

/*
    1往復だけのクライアント。
    送信は1回きりで、タイムアウトや取りこぼしがあっても再送しない
*/
pub struct Client {
    handler: UdpMessageHandler,
    server: SocketAddr,
    timeout: Option<Duration>,
}

impl Client {
    pub async fn connect(config: &Config) -> Result<Self> {
        let server = ipc::resolve(&config.addr).await?;
        let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let handler = UdpMessageHandler::bind(local).await?;
        debug!("client bound to {}", handler.local_addr()?);

        Ok(Client {
            handler,
            server,
            timeout: config.timeout(),
        })
    }

    pub async fn request(&self, polynomial: &Polynomial) -> Result<String> {
        let payload = ipc::encode(polynomial);
        self.handler.send_text(&payload, self.server).await?;
        info!("sent request to {}: {payload}", self.server);
        debug!("{}", ipc::display_request(&Request::from(*polynomial)));

        match self.handler.recv_datagram(self.timeout).await? {
            Some((reply, from)) => {
                let reply = String::from_utf8_lossy(&reply).into_owned();
                info!("reply from {from}: {reply}");
                Ok(reply)
            }
            None => Err(Error::ReplyTimeout(self.timeout.unwrap_or(Duration::ZERO))),
        }
    }
}
