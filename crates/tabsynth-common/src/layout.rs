//! Artifact naming
//!
//! Every file the service produces is derived from the dataset identity, so
//! that a dataset's artifacts can be found (and removed) without extra state:
//!
//! | artifact | location |
//! |---|---|
//! | real table | `<dataset_root>/<id>_<name>` |
//! | synthetic table | `<synthetic_root>/<id>_s_<name>` |
//! | column plot | `<plot_root>/<id><column>.png` |
//! | scatter plot | `<plot_root>/<id><a><b>.png` |
//! | regression plot | `<plot_root>/<id><a><b>reg.png` |
//! | summaries | `<plot_root>/<id>column_shapes.png`, `<plot_root>/<id>column_pair_trends.png` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const COLUMN_SHAPES_SUFFIX: &str = "column_shapes.png";
pub const PAIR_TRENDS_SUFFIX: &str = "column_pair_trends.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    pub dataset_root: PathBuf,
    pub synthetic_root: PathBuf,
    pub plot_root: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("./static/data"),
            synthetic_root: PathBuf::from("./static/synthetic"),
            plot_root: PathBuf::from("./static/plots"),
        }
    }
}

impl ArtifactLayout {
    pub fn new(
        dataset_root: impl Into<PathBuf>,
        synthetic_root: impl Into<PathBuf>,
        plot_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            synthetic_root: synthetic_root.into(),
            plot_root: plot_root.into(),
        }
    }

    /// Layout with the three roots as subdirectories of `base`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self::new(base.join("data"), base.join("synthetic"), base.join("plots"))
    }

    /// Create all three roots.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dataset_root)?;
        std::fs::create_dir_all(&self.synthetic_root)?;
        std::fs::create_dir_all(&self.plot_root)?;
        Ok(())
    }

    pub fn real_table(&self, id: i64, name: &str) -> PathBuf {
        self.dataset_root.join(format!("{id}_{name}"))
    }

    pub fn synthetic_table(&self, id: i64, name: &str) -> PathBuf {
        self.synthetic_root.join(format!("{id}_s_{name}"))
    }

    pub fn column_plot_name(id: i64, column: &str) -> String {
        format!("{id}{column}.png")
    }

    pub fn scatter_plot_name(id: i64, first: &str, second: &str) -> String {
        format!("{id}{first}{second}.png")
    }

    pub fn regression_plot_name(id: i64, first: &str, second: &str) -> String {
        format!("{id}{first}{second}reg.png")
    }

    pub fn column_shapes_plot_name(id: i64) -> String {
        format!("{id}{COLUMN_SHAPES_SUFFIX}")
    }

    pub fn pair_trends_plot_name(id: i64) -> String {
        format!("{id}{PAIR_TRENDS_SUFFIX}")
    }

    /// Absolute location of a plot file name under the plot root.
    pub fn plot_path(&self, file_name: &str) -> PathBuf {
        self.plot_root.join(file_name)
    }
}
