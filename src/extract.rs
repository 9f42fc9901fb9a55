//! Extraction of image payloads from `/images`.
//!
//! Every direct child of `/images` is an image node. Its `data` property is written verbatim
//! to `<name>.bin`. Nodes without `data` (signature nodes, for one) are skipped, and a failed
//! write only fails that node. Decoding errors abort the whole run: once the framing of the
//! tree is suspect nothing after it can be trusted. Artifacts written before such an error
//! are left as they are.
//!
//! Concurrent runs into the same directory race on the files they share; the last writer
//! wins.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::blob::FitBlob;
use crate::error::Result;
use crate::node::FitNode;
use crate::prop::FitProp;

use fallible_iterator::FallibleIterator;

/// Path of the node holding the images.
pub const IMAGES_PATH: &str = "/images";

/// Name of the property holding an image payload.
pub const DATA_PROP: &str = "data";

const UNKNOWN: &str = "Unknown";
const NO_COMPRESSION: &str = "None";

/// The descriptive properties of an image node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub name: String,
    /// `type`, `"Unknown"` when absent.
    pub image_type: String,
    /// `description`, `"Unknown"` when absent.
    pub description: String,
    /// `compression`, `"None"` when absent. Payloads are never decompressed.
    pub compression: String,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub load: Option<u64>,
    pub entry: Option<u64>,
}

/// The leading string of a text property. Values that hold no string are rendered instead.
fn prop_text(prop: Option<FitProp<'_, '_>>) -> Option<String> {
    prop.map(|p| match p.str() {
        Ok(s) => s.to_owned(),
        Err(_) => p.value().to_string(),
    })
}

impl ImageInfo {
    /// Read the recognized properties of `node`. Missing properties take their defaults.
    pub fn read(node: &FitNode<'_, '_>) -> Result<Self> {
        Ok(Self {
            name: node.name()?.to_owned(),
            image_type: prop_text(node.prop("type")?).unwrap_or_else(|| UNKNOWN.into()),
            description: prop_text(node.prop("description")?).unwrap_or_else(|| UNKNOWN.into()),
            compression: prop_text(node.prop("compression")?)
                .unwrap_or_else(|| NO_COMPRESSION.into()),
            os: prop_text(node.prop("os")?),
            arch: prop_text(node.prop("arch")?),
            load: node.prop("load")?.and_then(|p| p.cells()),
            entry: node.prop("entry")?.and_then(|p| p.cells()),
        })
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processing image: {}, type: {}, Description: {}, Compression: {}",
            self.name, self.image_type, self.description, self.compression
        )?;
        if let Some(os) = &self.os {
            write!(f, ", OS: {}", os)?;
        }
        if let Some(arch) = &self.arch {
            write!(f, ", Arch: {}", arch)?;
        }
        if let Some(load) = self.load {
            write!(f, ", Load: {:#x}", load)?;
        }
        if let Some(entry) = self.entry {
            write!(f, ", Entry: {:#x}", entry)?;
        }
        Ok(())
    }
}

/// What happened to one image node.
#[derive(Debug)]
pub enum ImageStatus {
    /// The payload was written to `path`.
    Extracted { path: PathBuf, bytes: usize },
    /// The node has no `data` property.
    SkippedNoData,
    /// Writing the payload failed.
    Failed(io::Error),
}

#[derive(Debug)]
pub struct ImageOutcome {
    pub info: ImageInfo,
    pub status: ImageStatus,
}

impl fmt::Display for ImageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.info)?;
        match &self.status {
            ImageStatus::Extracted { path, .. } => {
                write!(f, "Extracted {} to {}", self.info.name, path.display())
            }
            ImageStatus::SkippedNoData => {
                write!(f, "No data property found for {}", self.info.name)
            }
            ImageStatus::Failed(e) => write!(f, "Error writing {}: {}", self.info.name, e),
        }
    }
}

/// The result of an extraction run.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// `/images` does not exist. Nothing was extracted, which is not an error.
    pub images_node_missing: bool,
    /// One entry per child of `/images`, in tree order.
    pub outcomes: Vec<ImageOutcome>,
}

impl ExtractReport {
    pub fn extracted(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ImageStatus::Extracted { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ImageStatus::SkippedNoData))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ImageStatus::Failed(_)))
    }

    /// True when every image node was either extracted or skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }
}

impl fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.images_node_missing {
            return writeln!(f, "Could not find the {} node in the FIT file.", IMAGES_PATH);
        }
        for outcome in &self.outcomes {
            writeln!(f, "{}", outcome)?;
        }
        Ok(())
    }
}

/// Destination of extracted payloads.
pub trait ArtifactWriter {
    /// Store `data` as the artifact of image node `name`, returning where it went.
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<PathBuf>;
}

/// Writes `<dir>/<name>.bin`, replacing any existing file. The directory must exist.
#[derive(Debug, Clone)]
pub struct DirWriter {
    dir: PathBuf,
}

impl DirWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The artifact path for node `name`. Names that would escape the directory are refused.
    pub fn artifact_path(&self, name: &str) -> io::Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("node name {:?} is not a valid file name", name),
            ));
        }
        Ok(self.dir.join(format!("{}.bin", name)))
    }
}

impl ArtifactWriter for DirWriter {
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.artifact_path(name)?;
        fs::write(&path, data)?;
        Ok(path)
    }
}

/// Extract every image under `/images` into `output_dir`.
pub fn extract_images<P: AsRef<Path>>(fit: &FitBlob<'_>, output_dir: P) -> Result<ExtractReport> {
    extract_images_with(fit, &mut DirWriter::new(output_dir.as_ref()))
}

/// Extract every image under `/images` through `writer`.
pub fn extract_images_with<W: ArtifactWriter + ?Sized>(
    fit: &FitBlob<'_>,
    writer: &mut W,
) -> Result<ExtractReport> {
    let mut report = ExtractReport::default();

    let images = match fit.find_path(IMAGES_PATH)? {
        Some(images) => fit.node(images),
        None => {
            warn!("no {} node", IMAGES_PATH);
            report.images_node_missing = true;
            return Ok(report);
        }
    };

    let mut children = images.children();
    while let Some(node) = children.next()? {
        let info = ImageInfo::read(&node)?;
        debug!(
            image = %info.name,
            kind = %info.image_type,
            compression = %info.compression,
            "image node"
        );

        let status = match node.prop(DATA_PROP)? {
            None => {
                debug!(image = %info.name, "no data property");
                ImageStatus::SkippedNoData
            }
            Some(data) => match writer.write_artifact(&info.name, data.raw()) {
                Ok(path) => {
                    debug!(
                        image = %info.name,
                        path = %path.display(),
                        bytes = data.length(),
                        "extracted"
                    );
                    ImageStatus::Extracted {
                        path,
                        bytes: data.length(),
                    }
                }
                Err(e) => {
                    warn!(image = %info.name, error = %e, "write failed");
                    ImageStatus::Failed(e)
                }
            },
        };
        report.outcomes.push(ImageOutcome { info, status });
    }

    Ok(report)
}
