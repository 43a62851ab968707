use std::{
    fs::{File, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use crate::error::{Error, Result};

/* ログファイルを追記モードで開く。存在しなければ作成する */
pub fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/*
    ログの出力先を設定する。
    1イベント1行でタイムスタンプ付きのファイル出力と、標準エラー出力の2系統
*/
pub fn init(path: &Path, verbose: bool) -> Result<()> {
    let file = open_log(path)?;
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(level)
        .try_init()
        .map_err(|e| Error::LogInit(e.to_string()))
}
