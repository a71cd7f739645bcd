//! File memory tools.
//!
//! The agent gets a sandboxed directory to stash intermediate notes in.
//! Every path is resolved relative to the memory root; absolute paths and
//! parent traversal are rejected before touching the filesystem. Writes go
//! through a temp file in the same directory so a crashed write never
//! leaves a half-written note behind.

use crate::{CreateFileArgs, GetSizeArgs, ReadFileArgs, ToolEnv};
use deepclaw_core::error::ToolError;
use deepclaw_core::tool::ToolEffect;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Resolve a user-supplied path inside the memory root.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, ToolError> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(ToolError::InvalidArguments {
            tool_name: "file".into(),
            reason: format!("absolute paths are not allowed: {relative}"),
        });
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(ToolError::InvalidArguments {
                    tool_name: "file".into(),
                    reason: format!("path escapes the memory directory: {relative}"),
                });
            }
        }
    }
    Ok(root.join(candidate))
}

/// Total size of a file, or of every file under a directory.
fn size_of(path: &Path) -> Result<u64, ToolError> {
    let metadata = fs::metadata(path)
        .map_err(|_| ToolError::PathNotFound(path.display().to_string()))?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "get_size".into(),
            reason: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| ToolError::ExecutionFailed {
                tool_name: "get_size".into(),
                reason: e.to_string(),
            })?;
            let meta = entry.metadata().map_err(|e| ToolError::ExecutionFailed {
                tool_name: "get_size".into(),
                reason: e.to_string(),
            })?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Ok(total)
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

pub fn create_file(args: &CreateFileArgs, env: &ToolEnv) -> Result<ToolEffect, ToolError> {
    let target = resolve(&env.memory_root, &args.file_path)?;

    let content_len = args.content.len() as u64;
    if content_len > env.file_size_limit {
        return Err(ToolError::SizeLimitExceeded {
            path: args.file_path.clone(),
            limit_bytes: env.file_size_limit,
        });
    }
    let current_total = size_of(&env.memory_root).unwrap_or(0);
    if current_total + content_len > env.memory_size_limit {
        return Err(ToolError::SizeLimitExceeded {
            path: env.memory_root.display().to_string(),
            limit_bytes: env.memory_size_limit,
        });
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "create_file".into(),
            reason: e.to_string(),
        })?;
    }

    // Write-then-rename so readers never observe a partial file.
    let temp = target.with_file_name(format!(
        ".{}.tmp-{}",
        target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".into()),
        Uuid::new_v4().simple()
    ));
    fs::write(&temp, &args.content).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "create_file".into(),
        reason: e.to_string(),
    })?;
    fs::rename(&temp, &target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        ToolError::ExecutionFailed {
            tool_name: "create_file".into(),
            reason: e.to_string(),
        }
    })?;

    debug!(path = %args.file_path, bytes = content_len, "Wrote memory file");
    Ok(ToolEffect::output(format!(
        "Created {} ({})",
        args.file_path,
        human_size(content_len)
    )))
}

pub fn read_file(args: &ReadFileArgs, env: &ToolEnv) -> Result<ToolEffect, ToolError> {
    let target = resolve(&env.memory_root, &args.file_path)?;
    if !target.is_file() {
        return Err(ToolError::PathNotFound(args.file_path.clone()));
    }
    let content = fs::read_to_string(&target).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "read_file".into(),
        reason: e.to_string(),
    })?;
    Ok(ToolEffect::output(content))
}

pub fn get_size(args: &GetSizeArgs, env: &ToolEnv) -> Result<ToolEffect, ToolError> {
    let target = if args.file_or_dir_path.is_empty() {
        env.memory_root.clone()
    } else {
        resolve(&env.memory_root, &args.file_or_dir_path)?
    };
    let bytes = size_of(&target)?;
    let label = if args.file_or_dir_path.is_empty() {
        "memory"
    } else {
        args.file_or_dir_path.as_str()
    };
    Ok(ToolEffect::output(format!(
        "{label}: {} ({bytes} bytes)",
        human_size(bytes)
    )))
}
