/*
 * images.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Query result tables rendered as images.
 */

//! Query result tables rendered as images.
//!
//! The LaTeX and Markdown outputs reference `sql_result` cells as PNG files.
//! [`extract_images`] produces those files: each result table is wrapped in
//! the `table_image.html` page, screenshotted by a [`TableImageRenderer`]
//! and written to `<output>/images/<basename>_<k>.png`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlnb_template::{TemplateContext, TemplateValue};

use crate::Result;
use crate::config::SqlnbConfig;
use crate::emit::{result_image_name, sql_result_cells};
use crate::error::SqlnbError;
use crate::notebook::Notebook;
use crate::process::{ProcessFailure, run_with_timeout};
use crate::templates::{self, TABLE_IMAGE_TEMPLATE};

/// Time the browser gets on top of the render delay to start and exit.
const BROWSER_GRACE: Duration = Duration::from_secs(30);

const TRIM_TIMEOUT: Duration = Duration::from_secs(60);

/// Renders an HTML page to a PNG image.
pub trait TableImageRenderer: Send + Sync {
    /// Render `html` to `<out_dir>/<name>.png` and return the image path.
    ///
    /// The intermediate HTML file is removed and the image is cropped to
    /// its non-blank bounding box.
    fn render_table_image(&self, html: &str, out_dir: &Path, name: &str) -> Result<PathBuf>;
}

/// Screenshots pages with headless Chromium and trims them with ImageMagick.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    chromium: Option<PathBuf>,
    magick: Option<PathBuf>,
    delay: Duration,
    window: (u32, u32),
}

impl ChromiumRenderer {
    pub fn new(chromium: Option<PathBuf>, magick: Option<PathBuf>) -> Self {
        Self {
            chromium,
            magick,
            delay: Duration::from_secs(5),
            window: (1920, 1080),
        }
    }

    pub fn from_config(config: &SqlnbConfig) -> Result<Self> {
        Ok(Self {
            delay: config.images.delay(),
            window: config.images.window_size()?,
            ..Self::new(config.chromium(), config.magick())
        })
    }

    fn browser_arguments(&self, page: &Path, image: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--disable-infobars".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={},{}", self.window.0, self.window.1),
            format!("--virtual-time-budget={}", self.delay.as_millis()),
            format!("--screenshot={}", image.display()),
            format!("file://{}", page.display()),
        ]
    }

    fn screenshot(&self, page: &Path, image: &Path) -> Result<()> {
        let chromium = self.chromium.as_ref().ok_or_else(|| {
            SqlnbError::resource(
                page,
                "chromium not found (set SQLNB_CHROMIUM or binaries.chromium)",
            )
        })?;

        tracing::info!(page = %page.display(), "Rendering table image");
        let output = run_with_timeout(
            chromium,
            self.browser_arguments(page, image),
            None,
            None,
            self.delay + BROWSER_GRACE,
        )
        .map_err(|failure| match failure {
            ProcessFailure::Timeout(d) => SqlnbError::resource(
                page,
                format!("table render timed out after {}s", d.as_secs()),
            ),
            other => SqlnbError::resource(page, format!("cannot run chromium: {other}")),
        })?;

        if !output.status.success() || !image.is_file() {
            return Err(SqlnbError::resource(
                page,
                format!("chromium did not produce an image: {}", output.stderr_lossy().trim()),
            ));
        }
        Ok(())
    }

    fn trim(&self, image: &Path) -> Result<()> {
        let Some(magick) = &self.magick else {
            tracing::warn!(image = %image.display(), "ImageMagick not found, image left untrimmed");
            return Ok(());
        };

        let output = run_with_timeout(
            magick,
            [
                OsStr::new("mogrify"),
                OsStr::new("-trim"),
                OsStr::new("+repage"),
                image.as_os_str(),
            ],
            None,
            None,
            TRIM_TIMEOUT,
        )
        .map_err(|failure| SqlnbError::resource(image, format!("cannot trim image: {failure}")))?;

        if !output.status.success() {
            return Err(SqlnbError::resource(
                image,
                format!("cannot trim image: {}", output.stderr_lossy().trim()),
            ));
        }
        Ok(())
    }
}

impl TableImageRenderer for ChromiumRenderer {
    fn render_table_image(&self, html: &str, out_dir: &Path, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(out_dir)?;
        let out_dir = std::path::absolute(out_dir)?;
        let page = out_dir.join(format!("{name}.html"));
        let image = out_dir.join(format!("{name}.png"));

        std::fs::write(&page, html)?;
        let shot = self.screenshot(&page, &image);
        if let Err(e) = std::fs::remove_file(&page) {
            tracing::warn!(page = %page.display(), error = %e, "Cannot remove table page");
        }
        shot?;

        self.trim(&image)?;
        Ok(image)
    }
}

/// Render every `sql_result` cell to `<output>/images/<basename>_<k>.png`.
pub fn extract_images(
    notebook: &Notebook,
    output: &Path,
    basename: &str,
    renderer: &dyn TableImageRenderer,
) -> Result<Vec<PathBuf>> {
    let template = templates::load_template(None, TABLE_IMAGE_TEMPLATE)?;
    let images_dir = output.join("images");

    sql_result_cells(notebook)
        .map(|(k, cell)| {
            let mut ctx = TemplateContext::new();
            ctx.insert("table", TemplateValue::from(cell.source.as_str()));
            let html = template.render(&ctx)?;
            renderer.render_table_image(&html, &images_dir, &result_image_name(basename, k))
        })
        .collect()
}
