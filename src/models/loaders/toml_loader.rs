use crate::error::FileError;
use crate::models::case_script::CaseScript;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载病例脚本
pub async fn load_case_script(toml_file_path: &Path) -> Result<CaseScript, FileError> {
    let path_str = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let script: CaseScript = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path_str.clone(),
        source,
    })?;

    Ok(script.with_file_path(path_str))
}

/// 从文件夹中加载所有病例脚本
///
/// 解析失败的文件只记录警告并跳过；结果按文件名排序，保证顺序稳定。
pub async fn load_case_library(folder_path: &str) -> Result<Vec<CaseScript>, FileError> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        });
    }

    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: folder_path.to_string(),
            source,
        })?;

    let mut toml_files = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| FileError::ReadFailed {
                path: folder_path.to_string(),
                source,
            })?;
        let Some(entry) = entry else { break };
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut scripts = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载病例脚本: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_case_script(&path).await {
            Ok(script) => {
                tracing::info!("成功加载 [{}]，共 {} 个片段", script.diagnosis, script.parts.len());
                scripts.push(script);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(scripts)
}
