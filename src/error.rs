/* サーバとクライアントで共通のエラー定義 */

use std::{io, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot resolve address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("send to {dst} failed: {source}")]
    Send {
        dst: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /* サーバ側: 待受け期間内にリクエストが来なかった。障害ではない */
    #[error("no request within {0:?}")]
    IdleTimeout(Duration),

    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),

    #[error("cannot open log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logging already initialised: {0}")]
    LogInit(String),

    #[error("config {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("cannot install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("invalid coefficients: {0}")]
    Coefficients(String),
}

impl Error {
    /* 終了コード0で終わってよいエラーかどうか */
    pub fn is_clean_shutdown(&self) -> bool {
        matches!(self, Error::IdleTimeout(_))
    }
}
