// SPDX-License-Identifier: GPL-3.0-only

//! Gallery picker collaborators

use super::ImagePicker;
use crate::errors::PickerError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Picker answering with a preselected file, or cancelling when empty
///
/// Used by the command line front end, where the "selection" happens on the
/// command line.
#[derive(Debug, Clone, Default)]
pub struct PathPicker {
    path: Option<PathBuf>,
}

impl PathPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A picker whose user always cancels
    pub fn cancelled() -> Self {
        Self::default()
    }
}

impl ImagePicker for PathPicker {
    fn pick(&self) -> BoxFuture<'_, Result<Option<PathBuf>, PickerError>> {
        async move {
            let Some(path) = self.path.clone() else {
                return Ok(None);
            };
            let metadata = tokio::fs::metadata(&path).await?;
            if !metadata.is_file() {
                return Err(PickerError::Read(format!("{} is not a file", path.display())));
            }
            Ok(Some(path))
        }
        .boxed()
    }
}
