use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use time::macros::format_description;
use tracing::debug;

use crate::{
    error::{LogError, Result},
    level::{LogRecord, SeverityLevel},
};

/// 世代管理されたログファイルに出力するシンク
///
/// `setup`されたとき、既存のログファイルを`{path}.1`, `{path}.2`, ...に退避してから、
/// `{path}`を新しく開く。同じパスのローテーションは、このシンクが存在する間に1回だけ行う。
#[derive(Debug)]
pub struct RotatingFileSink {
    path: Option<PathBuf>,
    retention_count: u16,
    min_level: SeverityLevel,
    rotated: HashSet<PathBuf>,
    writer: Option<File>,
}

impl RotatingFileSink {
    /// ファイルを開いていない`RotatingFileSink`を作成する。
    pub fn new(min_level: SeverityLevel) -> Self {
        Self {
            path: None,
            retention_count: 0,
            min_level,
            rotated: HashSet::new(),
            writer: None,
        }
    }

    /// ログファイルを設定する。
    ///
    /// # 引数
    ///
    /// * path: ログファイルのパス。空文字列の場合、ファイルへの出力を無効にする。
    /// * retention_count: 残す過去の世代の最大数。
    /// * min_level: 記録するログの最小の重要度。
    ///
    /// # 戻り値
    ///
    /// ローテーション、またはファイルのオープンに失敗した場合はエラー。
    /// 失敗した場合、ファイルへの出力は無効になる。
    pub fn setup(
        &mut self,
        path: impl AsRef<Path>,
        retention_count: u16,
        min_level: SeverityLevel,
    ) -> Result<()> {
        // 同時に開くログファイルは1つのみ。
        self.writer = None;
        self.path = None;
        self.retention_count = retention_count;
        self.min_level = min_level;

        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            debug!("file logging disabled");
            return Ok(());
        }

        let key = normalize_path(path);
        if !self.rotated.contains(&key) && path.is_file() {
            rotate_log_files(path, retention_count)?;
        }

        let writer = create_writer(path).map_err(|e| LogError::io("open", path, e))?;
        self.rotated.insert(key);
        self.writer = Some(writer);
        self.path = Some(path.to_path_buf());

        Ok(())
    }

    /// しきい値を満たすレコードを1行としてログファイルに追記する。
    ///
    /// ファイルが開かれていない場合は何もしない。
    pub fn write(&mut self, record: &LogRecord) -> Result<()> {
        if !record.is_admitted_by(self.min_level) {
            return Ok(());
        }
        let (Some(writer), Some(path)) = (self.writer.as_mut(), self.path.as_ref()) else {
            return Ok(());
        };

        let line = format_line(record)?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| LogError::io("write", path, e))
    }

    /// 現在書き込んでいるログファイルのパス。
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn retention_count(&self) -> u16 {
        self.retention_count
    }

    pub fn min_level(&self) -> SeverityLevel {
        self.min_level
    }
}

/// 過去のログファイルの世代をずらす。
///
/// 最も古い世代`{path}.{retention_count}`を削除したあと、新しい世代が古い世代を上書きしないように、
/// 大きい世代から順番に名前を変更する。終了したとき、`path`は存在しない。
///
/// # 引数
///
/// * path: ログファイルのパス。
/// * retention_count: 残す過去の世代の最大数。`0`の場合、過去のログファイルは残さない。
fn rotate_log_files(path: &Path, retention_count: u16) -> Result<()> {
    if retention_count == 0 {
        return fs::remove_file(path).map_err(|e| LogError::io("remove", path, e));
    }

    let oldest = generation_path(path, retention_count);
    if oldest.is_file() {
        fs::remove_file(&oldest).map_err(|e| LogError::io("remove", &oldest, e))?;
    }

    for generation in (1..=retention_count).rev() {
        let source = if generation == 1 {
            path.to_path_buf()
        } else {
            generation_path(path, generation - 1)
        };
        if source.is_file() {
            let target = generation_path(path, generation);
            debug!(from = %source.display(), to = %target.display(), "rotating log file");
            fs::rename(&source, &target).map_err(|e| LogError::io("rename", &source, e))?;
        }
    }

    Ok(())
}

/// 世代番号を付けたログファイルのパスを返却する。
///
/// ログファイル名は、`{path}.{generation}`となる。
fn generation_path(path: &Path, generation: u16) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", generation));
    PathBuf::from(name)
}

/// ローテーション済みのパスを記録するときのキー。
///
/// 絶対パスに変換して、`.`と`..`を取り除く。シンボリックリンクは解決しない。
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    normalized
}

/// `HH:MM:SS LEVEL message`形式の1行を作成する。
fn format_line(record: &LogRecord) -> Result<String> {
    let format = format_description!("[hour]:[minute]:[second]");
    let time = record.timestamp.format(&format)?;

    Ok(format!("{} {} {}\n", time, record.level, record.message))
}

/// ライターを作成する。
///
/// 親ディレクトリが存在しない場合は作成する。
///
/// # 引数
///
/// * path: ログファイルパス。
///
/// # 戻り値
///
/// `File`インスタンス。
fn create_writer(path: &Path) -> io::Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.append(true).create(true);

    let new_file = open_options.open(path);
    if new_file.is_err() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            return open_options.open(path);
        }
    }

    new_file
}
