//! Document metadata via `pdfinfo`.
//!
//! `pdfinfo` prints one `Key: value` line per field. Only `Pages` is
//! needed by the renderer pipeline; everything else is passed through
//! verbatim in [`PdfInfo::fields`].

use crate::config::InfoOptions;
use crate::error::Pdf2ImageError;
use crate::output::PdfInfo;
use crate::pipeline::process::{self, Completion};
use poppler_locate::PopplerTool;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Split `pdfinfo` output into fields.
///
/// Each line is cut at its first `:`; lines without one or with an empty
/// key are skipped and a repeated key keeps its last value.
pub fn parse_fields(text: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.insert(key.to_string(), value.trim().to_string());
    }
    fields
}

/// Parse `pdfinfo` output, requiring an integer `Pages` field.
pub fn parse_pdfinfo(text: &str) -> Result<PdfInfo, Pdf2ImageError> {
    let fields = parse_fields(text);
    let page_count = match fields.get("Pages") {
        Some(v) => v.parse::<u32>().map_err(|_| Pdf2ImageError::PageCountUnavailable {
            detail: format!("'Pages' is not an integer: {v:?}"),
        })?,
        None => {
            return Err(Pdf2ImageError::PageCountUnavailable {
                detail: "pdfinfo output has no 'Pages' field".into(),
            })
        }
    };
    Ok(PdfInfo { page_count, fields })
}

/// Arguments for `pdfinfo`, document path first.
pub fn build_info_args(pdf_path: &Path, options: &InfoOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![pdf_path.into()];
    if let Some(ref pw) = options.userpw {
        args.push("-upw".into());
        args.push(pw.into());
    }
    if let Some(ref pw) = options.ownerpw {
        args.push("-opw".into());
        args.push(pw.into());
    }
    if options.rawdates {
        args.push("-rawdates".into());
    }
    if let Some(first) = options.first_page {
        args.push("-f".into());
        args.push(first.to_string().into());
    }
    if let Some(last) = options.last_page {
        args.push("-l".into());
        args.push(last.to_string().into());
    }
    args
}

/// Run `pdfinfo` on `pdf_path` and parse the result.
///
/// When no page count comes back, the error carries whatever `pdfinfo`
/// printed on stderr (usually the reason the document could not be opened).
pub async fn fetch(pdf_path: &Path, options: &InfoOptions) -> Result<PdfInfo, Pdf2ImageError> {
    let poppler_path = options.poppler_path.as_deref();
    let binary = poppler_locate::resolve(PopplerTool::Pdfinfo, poppler_path);
    let args = build_info_args(pdf_path, options);

    let output = match process::run(&binary, &args, poppler_path, options.timeout).await? {
        Completion::Finished(output) => output,
        Completion::TimedOut { .. } => {
            return Err(Pdf2ImageError::Timeout {
                binary: PopplerTool::Pdfinfo.name().to_string(),
                timeout: options.timeout.unwrap_or_default(),
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    match parse_pdfinfo(&stdout) {
        Ok(info) => {
            debug!("pdfinfo: {} pages", info.page_count);
            Ok(info)
        }
        Err(Pdf2ImageError::PageCountUnavailable { detail }) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            Err(Pdf2ImageError::PageCountUnavailable {
                detail: if stderr.is_empty() { detail } else { stderr.to_string() },
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Title:          Quarterly: Results
Producer:       pdfTeX-1.40.21
CreationDate:   Tue Mar  1 10:00:00 2022 CET
Tagged:         no
Pages:          14
Encrypted:      no
Page size:      612 x 792 pts (letter)
PDF version:    1.5
";

    #[test]
    fn parses_sample() {
        let info = parse_pdfinfo(SAMPLE).unwrap();
        assert_eq!(info.page_count, 14);
        assert_eq!(info.get("Title"), Some("Quarterly: Results"));
        assert_eq!(info.get("CreationDate"), Some("Tue Mar  1 10:00:00 2022 CET"));
        assert_eq!(info.pdf_version(), Some("1.5"));
        assert_eq!(info.fields().len(), 8);
    }

    #[test]
    fn skips_lines_without_key() {
        let fields = parse_fields("garbage line\n: orphan value\nPages: 2\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("Pages").map(String::as_str), Some("2"));
    }

    #[test]
    fn later_duplicate_wins() {
        let info = parse_pdfinfo("Pages: 1\nPages: 3\n").unwrap();
        assert_eq!(info.page_count, 3);
    }

    #[test]
    fn missing_pages_is_content_error() {
        let err = parse_pdfinfo("Title: x\n").unwrap_err();
        assert!(matches!(err, Pdf2ImageError::PageCountUnavailable { .. }));
    }

    #[test]
    fn non_integer_pages_rejected() {
        let err = parse_pdfinfo("Pages: many\n").unwrap_err();
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn info_args_order() {
        let opts = InfoOptions::default()
            .userpw("u")
            .ownerpw("o")
            .rawdates(true)
            .pages(Some(2), Some(5));
        let args: Vec<String> = build_info_args(Path::new("a.pdf"), &opts)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["a.pdf", "-upw", "u", "-opw", "o", "-rawdates", "-f", "2", "-l", "5"]
        );
        assert_eq!(build_info_args(Path::new("a.pdf"), &InfoOptions::default()).len(), 1);
    }
}
