use std::{convert::Infallible, fmt, future::Future, net::SocketAddr, time::Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ipc::{self, reply::format_reply, Malformed, UdpMessageHandler};
use crate::solver::Solver;

/* 1回のループで起きたこと */
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Replied { peer: SocketAddr, reply: String },
    Dropped { peer: SocketAddr, reason: Malformed },
}

/* ループを止めたシグナル */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Interrupted,
    Terminated,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stop::Interrupted => write!(f, "interrupted"),
            Stop::Terminated => write!(f, "terminated"),
        }
    }
}

/*
    SIGINT と SIGTERM の受け口。
    起動直後に install しておけば、ループ開始前に届いたシグナルも取りこぼさない
*/
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(ShutdownSignals {
            interrupt: signal(SignalKind::interrupt()).map_err(Error::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(Error::Signal)?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(ShutdownSignals {})
    }

    #[cfg(unix)]
    pub async fn recv(&mut self) -> Stop {
        tokio::select! {
            _ = self.interrupt.recv() => Stop::Interrupted,
            _ = self.terminate.recv() => Stop::Terminated,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Stop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot wait for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        Stop::Interrupted
    }
}

/*
    1ソケット・1ループのサーバ。
    Listening -> (受信) -> Processing -> (返信 or 破棄) -> Listening
    idle_timeout が設定されていれば、各ループの受信待ちにだけ期限を付ける
*/
pub struct Server {
    handler: UdpMessageHandler,
    solver: Solver,
    idle_timeout: Option<Duration>,
}

impl Server {
    pub async fn bind(config: &Config) -> Result<Self> {
        Ok(Server {
            handler: UdpMessageHandler::bind(&config.addr).await?,
            solver: Solver::new(config.discriminant_epsilon),
            idle_timeout: config.timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.handler.local_addr()
    }

    /* データグラムから返信テキストを作る。不正な要求なら理由を返す */
    pub fn dispatch(&self, payload: &[u8]) -> std::result::Result<String, Malformed> {
        let request = ipc::decode(payload);
        debug!("decoded {}", ipc::display_request(&request));

        let polynomial = request.into_polynomial()?;

        let roots = self.solver.solve(&polynomial);
        debug!(
            "discriminant {:?}, roots {}",
            self.solver.discriminant(&polynomial),
            serde_json::to_string(&roots).unwrap_or_default()
        );
        Ok(format_reply(&polynomial, &roots))
    }

    /* 1リクエスト分の処理。期限切れは IdleTimeout として返す */
    pub async fn serve_one(&self) -> Result<Outcome> {
        let (payload, peer) = match self.handler.recv_datagram(self.idle_timeout).await? {
            Some(received) => received,
            None => {
                return Err(Error::IdleTimeout(
                    self.idle_timeout.unwrap_or(Duration::ZERO),
                ))
            }
        };

        info!("request from {peer}");
        info!("datagram of {} bytes", payload.len());
        info!("payload {:?}", String::from_utf8_lossy(&payload));

        match self.dispatch(&payload) {
            Ok(reply) => {
                self.handler.send_text(&reply, peer).await?;
                info!("replied to {peer}: {reply}");
                Ok(Outcome::Replied { peer, reply })
            }
            Err(reason) => {
                warn!("dropped malformed request from {peer}: {reason}");
                Ok(Outcome::Dropped { peer, reason })
            }
        }
    }

    /* エラーになるまで1件ずつ処理し続ける */
    pub async fn run(&self) -> Result<Infallible> {
        info!("listening on {}", self.local_addr()?);
        if let Some(window) = self.idle_timeout {
            info!("idle timeout {window:?}");
        }
        loop {
            self.serve_one().await?;
        }
    }

    /* stop が先に完了したらループを捨てて戻る。処理中のリクエストは待たない */
    pub async fn run_until(&self, stop: impl Future<Output = Stop>) -> Result<Stop> {
        tokio::select! {
            result = self.run() => match result? {},
            stop = stop => Ok(stop),
        }
    }
}
