//! Renderer selection and argument construction.
//!
//! A request is planned once ([`plan`]) into a [`RenderPlan`]: which renderer
//! binary runs, which format it really emits, and which version-gated
//! options survive. Every worker then gets its own argument vector from
//! [`build_render_args`], differing only in page span and output prefix.
//!
//! Each option maps to exactly one flag (or flag/value pair) and is simply
//! left out when unset.

use crate::config::{ConversionConfig, JpegOptions, Size};
use crate::error::Pdf2ImageError;
use crate::format::ImageFormat;
use crate::pipeline::partition::PageRange;
use crate::pipeline::version::PopplerVersion;
use poppler_locate::PopplerTool;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// The two interchangeable page renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Raster renderer; can stream pages to stdout.
    Pdftoppm,
    /// Cairo renderer; file output only.
    Pdftocairo,
}

impl Renderer {
    pub fn tool(self) -> PopplerTool {
        match self {
            Renderer::Pdftoppm => PopplerTool::Pdftoppm,
            Renderer::Pdftocairo => PopplerTool::Pdftocairo,
        }
    }

    pub fn name(self) -> &'static str {
        self.tool().name()
    }

    /// The renderer can write a page stream to stdout.
    pub fn streams_to_stdout(self) -> bool {
        matches!(self, Renderer::Pdftoppm)
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request-wide rendering decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub renderer: Renderer,
    /// Format the renderer actually emits.
    pub format: ImageFormat,
    pub jpegopt: Option<JpegOptions>,
    pub hide_annotations: bool,
}

impl RenderPlan {
    /// A version-gated option is in play, so the renderer should be probed.
    pub fn needs_version_probe(&self) -> bool {
        self.jpegopt.is_some() || self.hide_annotations
    }

    /// Drop options the installed renderer is too old to understand.
    pub fn apply_version(&mut self, version: PopplerVersion) {
        if self.jpegopt.is_some() && !version.supports_jpegopt() {
            warn!("poppler {} does not support -jpegopt; ignoring JPEG options", version);
            self.jpegopt = None;
        }
        if self.hide_annotations && !version.supports_hide_annotations() {
            warn!("poppler {} does not support -hide-annotations; annotations will be rendered", version);
            self.hide_annotations = false;
        }
    }
}

/// Pick the renderer a request needs.
///
/// Cairo is mandatory when asked for explicitly, when the format only
/// exists there (TIFF), or for transparent PNG/TIFF output.
pub fn select_renderer(config: &ConversionConfig) -> Renderer {
    let format = config.format.with_grayscale(config.grayscale);
    if config.use_pdftocairo
        || format.requires_cairo()
        || (config.transparent && format.supports_transparency())
    {
        Renderer::Pdftocairo
    } else {
        Renderer::Pdftoppm
    }
}

/// Resolve renderer, effective format and option set for a request.
///
/// Fails before anything is spawned when the chosen renderer cannot
/// express a requested option.
pub fn plan(config: &ConversionConfig) -> Result<RenderPlan, Pdf2ImageError> {
    let renderer = select_renderer(config);
    let mut format = config.format.with_grayscale(config.grayscale);

    if renderer == Renderer::Pdftocairo && format.is_raw() {
        debug!("pdftocairo cannot emit {}; rendering PNG instead", format);
        format = ImageFormat::Png;
    }

    if config.hide_annotations && renderer == Renderer::Pdftocairo {
        return Err(Pdf2ImageError::UnsupportedOption {
            option: "hide_annotations",
            renderer: "pdftocairo",
        });
    }

    if config.transparent && !format.supports_transparency() {
        warn!("Transparency is only available for PNG and TIFF; rendering {} opaque", format);
    }

    let jpegopt = match config.jpegopt {
        Some(ref opts) if format == ImageFormat::Jpeg && !opts.is_empty() => Some(opts.clone()),
        _ => None,
    };

    Ok(RenderPlan {
        renderer,
        format,
        jpegopt,
        hide_annotations: config.hide_annotations,
    })
}

/// Argument vector for one renderer worker.
///
/// `output_prefix` is `<dir>/<tag>` in file mode and `None` when the
/// renderer should stream to stdout.
pub fn build_render_args(
    config: &ConversionConfig,
    plan: &RenderPlan,
    pdf_path: &Path,
    range: PageRange,
    output_prefix: Option<&Path>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-r".into(), config.dpi.to_string().into(), pdf_path.into()];

    if config.use_cropbox {
        args.push("-cropbox".into());
    }
    if plan.hide_annotations {
        args.push("-hide-annotations".into());
    }
    if config.transparent && plan.format.supports_transparency() {
        args.push("-transp".into());
    }

    args.push("-f".into());
    args.push(range.start.to_string().into());
    args.push("-l".into());
    args.push(range.end.to_string().into());

    if let Some(flag) = plan.format.renderer_flag() {
        args.push(flag.into());
    }
    if let Some(ref jpeg) = plan.jpegopt {
        args.push("-jpegopt".into());
        args.push(jpeg.to_arg().into());
    }
    if config.single_file {
        args.push("-singlefile".into());
    }
    if let Some(prefix) = output_prefix {
        args.push(prefix.into());
    }
    if let Some(ref pw) = config.userpw {
        args.push("-upw".into());
        args.push(pw.into());
    }
    if let Some(ref pw) = config.ownerpw {
        args.push("-opw".into());
        args.push(pw.into());
    }
    if config.grayscale || plan.format == ImageFormat::Pgm {
        args.push("-gray".into());
    }

    match config.size {
        None => {}
        Some(Size::Scale(n)) => {
            args.push("-scale-to".into());
            args.push(n.to_string().into());
        }
        Some(Size::Dimensions { width, height }) => {
            let side = |v: Option<u32>| v.map_or_else(|| "-1".to_string(), |n| n.to_string());
            args.push("-scale-to-x".into());
            args.push(side(width).into());
            args.push("-scale-to-y".into());
            args.push(side(height).into());
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn args_for(config: &ConversionConfig, range: PageRange, prefix: Option<&Path>) -> Vec<String> {
        let plan = plan(config).unwrap();
        strings(&build_render_args(config, &plan, Path::new("doc.pdf"), range, prefix))
    }

    const ONE_TO_FOUR: PageRange = PageRange { start: 1, end: 4 };

    #[test]
    fn minimal_ppm_to_stdout() {
        let args = args_for(&ConversionConfig::default(), ONE_TO_FOUR, None);
        assert_eq!(args, vec!["-r", "200", "doc.pdf", "-f", "1", "-l", "4"]);
    }

    #[test]
    fn full_option_set_in_order() {
        let config = ConversionConfig::builder()
            .dpi(300)
            .format(ImageFormat::Jpeg)
            .jpegopt(JpegOptions {
                quality: Some(90),
                progressive: Some(true),
                optimize: Some(false),
            })
            .use_cropbox(true)
            .hide_annotations(true)
            .userpw("u")
            .ownerpw("o")
            .grayscale(true)
            .size(Size::Scale(1000))
            .build()
            .unwrap();
        let prefix = PathBuf::from("/out/tag");
        let args = args_for(&config, PageRange { start: 5, end: 8 }, Some(&prefix));
        assert_eq!(
            args,
            vec![
                "-r", "300", "doc.pdf", "-cropbox", "-hide-annotations", "-f", "5", "-l", "8",
                "-jpeg", "-jpegopt", "quality=90,progressive=y,optimize=n", "/out/tag", "-upw",
                "u", "-opw", "o", "-gray", "-scale-to", "1000",
            ]
        );
    }

    #[test]
    fn size_pair_uses_auto_sentinel() {
        let config = ConversionConfig::builder()
            .size(Size::Dimensions {
                width: None,
                height: Some(2400),
            })
            .build()
            .unwrap();
        let args = args_for(&config, ONE_TO_FOUR, None);
        assert!(args.ends_with(&["-scale-to-x".into(), "-1".into(), "-scale-to-y".into(), "2400".into()]));
    }

    #[test]
    fn grayscale_raw_becomes_pgm() {
        let config = ConversionConfig::builder().grayscale(true).build().unwrap();
        let p = plan(&config).unwrap();
        assert_eq!(p.format, ImageFormat::Pgm);
        assert_eq!(p.renderer, Renderer::Pdftoppm);
        let args = args_for(&config, ONE_TO_FOUR, None);
        assert_eq!(args.last().map(String::as_str), Some("-gray"));
    }

    #[test]
    fn tiff_requires_cairo() {
        let config = ConversionConfig::builder().format(ImageFormat::Tiff).build().unwrap();
        assert_eq!(select_renderer(&config), Renderer::Pdftocairo);
        assert!(args_for(&config, ONE_TO_FOUR, None).contains(&"-tiff".to_string()));
    }

    #[test]
    fn transparency_selects_cairo_only_for_alpha_formats() {
        let png = ConversionConfig::builder()
            .format(ImageFormat::Png)
            .transparent(true)
            .build()
            .unwrap();
        assert_eq!(select_renderer(&png), Renderer::Pdftocairo);
        assert!(args_for(&png, ONE_TO_FOUR, None).contains(&"-transp".to_string()));

        let jpeg = ConversionConfig::builder()
            .format(ImageFormat::Jpeg)
            .transparent(true)
            .build()
            .unwrap();
        assert_eq!(select_renderer(&jpeg), Renderer::Pdftoppm);
        assert!(!args_for(&jpeg, ONE_TO_FOUR, None).contains(&"-transp".to_string()));
    }

    #[test]
    fn forced_cairo_promotes_raw_to_png() {
        let config = ConversionConfig::builder().use_pdftocairo(true).build().unwrap();
        let p = plan(&config).unwrap();
        assert_eq!(p.renderer, Renderer::Pdftocairo);
        assert_eq!(p.format, ImageFormat::Png);
    }

    #[test]
    fn hide_annotations_rejected_for_cairo() {
        let config = ConversionConfig::builder()
            .use_pdftocairo(true)
            .hide_annotations(true)
            .build()
            .unwrap();
        let err = plan(&config).unwrap_err();
        assert!(matches!(err, Pdf2ImageError::UnsupportedOption { .. }));
    }

    #[test]
    fn jpegopt_ignored_for_other_formats() {
        let config = ConversionConfig::builder()
            .format(ImageFormat::Png)
            .jpegopt(JpegOptions::quality(80))
            .build()
            .unwrap();
        let p = plan(&config).unwrap();
        assert!(p.jpegopt.is_none());
        assert!(!p.needs_version_probe());
    }

    #[test]
    fn old_poppler_drops_gated_flags() {
        let config = ConversionConfig::builder()
            .format(ImageFormat::Jpeg)
            .jpegopt(JpegOptions::quality(80))
            .hide_annotations(true)
            .build()
            .unwrap();
        let mut p = plan(&config).unwrap();
        assert!(p.needs_version_probe());
        p.apply_version(PopplerVersion { major: 0, minor: 50 });
        assert!(p.jpegopt.is_none());
        assert!(!p.hide_annotations);

        let args = strings(&build_render_args(&config, &p, Path::new("doc.pdf"), ONE_TO_FOUR, None));
        assert!(!args.contains(&"-jpegopt".to_string()));
        assert!(!args.contains(&"-hide-annotations".to_string()));
    }

    #[test]
    fn unknown_version_drops_gated_flags() {
        let config = ConversionConfig::builder()
            .format(ImageFormat::Jpeg)
            .jpegopt(JpegOptions::quality(80))
            .hide_annotations(true)
            .build()
            .unwrap();
        let mut p = plan(&config).unwrap();
        p.apply_version(crate::pipeline::version::parse_version("no version here"));
        assert!(p.jpegopt.is_none());
        assert!(!p.hide_annotations);
    }

    #[test]
    fn single_file_flag_precedes_prefix() {
        let config = ConversionConfig::builder().single_file(true).build().unwrap();
        let prefix = PathBuf::from("/out/one");
        let args = args_for(&config, PageRange { start: 3, end: 3 }, Some(&prefix));
        assert_eq!(&args[args.len() - 2..], &["-singlefile".to_string(), "/out/one".to_string()]);
    }
}
