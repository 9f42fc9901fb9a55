mod common;

use std::fs;
use std::io;
use std::path::PathBuf;

use common::{sample_fit, set_header_word, FdtBuilder, KERNEL_DATA};

use fit_rs::extract::{
    extract_images, extract_images_with, ArtifactWriter, DirWriter, ImageStatus,
};
use fit_rs::{FitBlob, FitError, HeaderFault};

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn kernel_extracted_signature_skipped() {
    let blob = sample_fit();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = extract_images(&fit, out.path()).unwrap();

    assert!(!report.images_node_missing);
    assert_eq!(dir_entries(out.path()), ["kernel.bin"]);
    assert_eq!(fs::read(out.path().join("kernel.bin")).unwrap(), KERNEL_DATA);

    assert_eq!(report.outcomes.len(), 2);
    let kernel = &report.outcomes[0];
    assert_eq!(kernel.info.name, "kernel");
    assert_eq!(kernel.info.image_type, "kernel");
    assert_eq!(kernel.info.description, "Linux kernel");
    assert_eq!(kernel.info.compression, "none");
    assert_eq!(kernel.info.os.as_deref(), Some("linux"));
    assert_eq!(kernel.info.arch.as_deref(), Some("arm64"));
    assert_eq!(kernel.info.load, Some(0x8008_0000));
    match &kernel.status {
        ImageStatus::Extracted { path, bytes } => {
            assert_eq!(*bytes, 16);
            assert_eq!(path, &out.path().join("kernel.bin"));
        }
        other => panic!("kernel not extracted: {:?}", other),
    }

    let signature = &report.outcomes[1];
    assert_eq!(signature.info.name, "signature");
    assert!(matches!(signature.status, ImageStatus::SkippedNoData));
    assert_eq!(
        signature.to_string(),
        "Processing image: signature, type: signature, Description: Unknown, Compression: None\n\
         No data property found for signature"
    );

    assert_eq!(report.extracted().count(), 1);
    assert_eq!(report.skipped().count(), 1);
    assert!(report.is_clean());
}

#[test]
fn missing_images_node() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("configurations")
        .end_node()
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = extract_images(&fit, out.path()).unwrap();
    assert!(report.images_node_missing);
    assert!(report.outcomes.is_empty());
    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(
        report.to_string(),
        "Could not find the /images node in the FIT file.\n"
    );
}

#[test]
fn descriptive_defaults() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("images")
        .begin_node("fdt-1")
        .prop("data", b"\xd0\x0d")
        .end_node()
        .end_node()
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = extract_images(&fit, out.path()).unwrap();
    let info = &report.outcomes[0].info;
    assert_eq!(info.image_type, "Unknown");
    assert_eq!(info.description, "Unknown");
    assert_eq!(info.compression, "None");
    assert_eq!(info.os, None);
    assert_eq!(info.load, None);
    assert_eq!(fs::read(out.path().join("fdt-1.bin")).unwrap(), b"\xd0\x0d");
}

#[test]
fn extraction_is_idempotent() {
    let blob = sample_fit();
    let fit = FitBlob::open(&blob).unwrap();

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    extract_images(&fit, first.path()).unwrap();
    extract_images(&fit, second.path()).unwrap();

    assert_eq!(dir_entries(first.path()), dir_entries(second.path()));
    assert_eq!(
        fs::read(first.path().join("kernel.bin")).unwrap(),
        fs::read(second.path().join("kernel.bin")).unwrap()
    );
}

#[test]
fn existing_artifacts_are_overwritten() {
    let blob = sample_fit();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(out.path().join("kernel.bin"), vec![0xaa; 4096]).unwrap();

    extract_images(&fit, out.path()).unwrap();
    assert_eq!(fs::read(out.path().join("kernel.bin")).unwrap(), KERNEL_DATA);
}

#[test]
fn bad_magic_creates_nothing() {
    let mut blob = sample_fit();
    set_header_word(&mut blob, 0, 0);
    let out = tempfile::tempdir().unwrap();

    let result = FitBlob::open(&blob).and_then(|fit| extract_images(&fit, out.path()));
    assert_eq!(
        result.unwrap_err(),
        FitError::MalformedHeader(HeaderFault::BadMagic { found: 0 })
    );
    assert!(dir_entries(out.path()).is_empty());
}

/// Fails for one chosen node, records everything else.
struct FlakyWriter {
    fail_on: &'static str,
    written: Vec<(String, Vec<u8>)>,
}

impl ArtifactWriter for FlakyWriter {
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        if name == self.fail_on {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.written.push((name.to_owned(), data.to_vec()));
        Ok(PathBuf::from(format!("{}.bin", name)))
    }
}

#[test]
fn write_failures_are_isolated() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("images")
        .begin_node("kernel")
        .prop("data", &KERNEL_DATA)
        .end_node()
        .begin_node("ramdisk")
        .prop("data", b"initrd")
        .end_node()
        .end_node()
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();

    let mut writer = FlakyWriter {
        fail_on: "kernel",
        written: Vec::new(),
    };
    let report = extract_images_with(&fit, &mut writer).unwrap();

    assert!(!report.is_clean());
    let failed: Vec<&str> = report.failed().map(|o| o.info.name.as_str()).collect();
    assert_eq!(failed, ["kernel"]);
    assert_eq!(writer.written, [("ramdisk".to_owned(), b"initrd".to_vec())]);
    assert!(report.outcomes[0]
        .to_string()
        .ends_with("Error writing kernel: disk full"));
}

#[test]
fn corruption_keeps_earlier_artifacts() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("images")
        .begin_node("kernel")
        .prop("data", &KERNEL_DATA)
        .end_node()
        .raw_word(0x99)
        .end_node()
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = extract_images(&fit, out.path()).unwrap_err();
    assert!(matches!(err, FitError::UnknownTag { tag: 0x99, .. }));
    assert_eq!(fs::read(out.path().join("kernel.bin")).unwrap(), KERNEL_DATA);
}

#[test]
fn unsafe_names_are_refused() {
    let writer = DirWriter::new("/tmp/out");
    assert_eq!(
        writer.artifact_path("kernel@1").unwrap(),
        PathBuf::from("/tmp/out/kernel@1.bin")
    );
    for name in ["", ".", "..", "a/b", "a\\b"] {
        assert_eq!(
            writer.artifact_path(name).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}

#[test]
fn unclosed_images_node_is_an_error() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("images")
        .begin_node("a")
        .prop("data", b"xy")
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = extract_images(&fit, out.path()).unwrap_err();
    assert!(matches!(err, FitError::TruncatedToken { .. }));
    assert_eq!(fs::read(out.path().join("a.bin")).unwrap(), b"xy");
}

#[test]
fn text_properties_read_as_strings() {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .begin_node("images")
        .begin_node("kernel")
        .prop_str("description", "Linux\tkernel")
        .prop("type", b"kernel\0\0")
        .prop("compression", &[1, 2, 3, 4])
        .prop("data", &KERNEL_DATA)
        .end_node()
        .end_node()
        .end_node();
    let blob = b.finish();
    let fit = FitBlob::open(&blob).unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = extract_images(&fit, out.path()).unwrap();
    let info = &report.outcomes[0].info;
    assert_eq!(info.description, "Linux\tkernel");
    assert_eq!(info.image_type, "kernel");
    // No string at all: rendered as a value.
    assert_eq!(info.compression, "0x1020304");
    assert!(report.outcomes[0].to_string().starts_with(
        "Processing image: kernel, type: kernel, Description: Linux\tkernel, Compression: 0x1020304"
    ));
}
