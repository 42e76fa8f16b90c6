//! Page handlers and the error boundary between the pipeline and the screen.
//!
//! A page is chosen by a selector outside the dashboard and passed to
//! [`Dashboard::evaluate`] on every cycle together with the current uploads.
//! Each evaluation runs the page's logic from scratch against the session
//! store and returns a [`PageView`]. Pipeline errors never escape `evaluate`;
//! they become [`Block::Error`] entries.

use std::{fmt::Write as _, path::PathBuf, str::FromStr};

use clap::ValueEnum;
use log::{debug, warn};

use crate::{
    config::Settings,
    data::Table,
    error::{DashboardResult, Notice, Source},
    ingest, merge,
    session::{SessionId, SessionStore},
    summary::{self, Summary, format_thousands},
    table::{Align, render_table},
};

const APP_TITLE: &str = "Pharmaceutical Data Dashboard";
const APP_SUBTITLE: &str = "A unified view for your data sources";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Page {
    #[default]
    Home,
    Ingestion,
    Summary,
    About,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Home, Page::Ingestion, Page::Summary, Page::About];

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Ingestion => "Data Ingestion",
            Page::Summary => "Data Summary",
            Page::About => "About",
        }
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "home" => Ok(Page::Home),
            "ingestion" | "dataingestion" | "ingest" => Ok(Page::Ingestion),
            "summary" | "datasummary" => Ok(Page::Summary),
            "about" => Ok(Page::About),
            _ => Err(format!(
                "Unknown page '{value}'. Choose one of: home, ingestion, summary, about"
            )),
        }
    }
}

/// Bytes of one uploaded file. The name only steers delimiter detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: PathBuf,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// State of the two upload widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    pub first: Option<Upload>,
    pub second: Option<Upload>,
}

impl Uploads {
    pub fn slot_mut(&mut self, source: Source) -> &mut Option<Upload> {
        match source {
            Source::First => &mut self.first,
            Source::Second => &mut self.second,
        }
    }

    pub fn both(&self) -> Option<(&Upload, &Upload)> {
        self.first.as_ref().zip(self.second.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Header(String),
    Subheader(String),
    Text(String),
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
    Metric { label: String, value: String },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        align: Vec<Align>,
    },
}

impl Block {
    fn table(table: &Table, limit: Option<usize>) -> Self {
        Block::Table {
            headers: table.headers(),
            rows: table.display_rows(limit),
            align: table
                .columns()
                .iter()
                .map(|c| if c.is_numeric() { Align::Right } else { Align::Left })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: Page,
    pub blocks: Vec<Block>,
}

impl PageView {
    fn new(page: Page) -> Self {
        Self {
            page,
            blocks: vec![
                Block::Header(APP_TITLE.to_string()),
                Block::Subheader(APP_SUBTITLE.to_string()),
                Block::Header(page.title().to_string()),
            ],
        }
    }

    fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Table { .. }))
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Error(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let _ = match block {
                Block::Header(text) => writeln!(out, "== {text} =="),
                Block::Subheader(text) => writeln!(out, "-- {text} --"),
                Block::Text(text) => writeln!(out, "{text}"),
                Block::Info(text) => writeln!(out, "[info] {text}"),
                Block::Success(text) => writeln!(out, "[success] {text}"),
                Block::Warning(text) => writeln!(out, "[warning] {text}"),
                Block::Error(text) => writeln!(out, "[error] {text}"),
                Block::Metric { label, value } => writeln!(out, "{label}: {value}"),
                Block::Table {
                    headers,
                    rows,
                    align,
                } => write!(out, "{}", render_table(headers, rows, align)),
            };
        }
        out
    }
}

pub struct Dashboard {
    settings: Settings,
    store: SessionStore,
}

impl Dashboard {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            store: SessionStore::new(),
        }
    }

    pub fn open_session(&mut self) -> SessionId {
        self.store.open()
    }

    pub fn merged(&self, session: SessionId) -> Option<&Table> {
        self.store.merged(session)
    }

    /// Runs one evaluation cycle of `page`.
    pub fn evaluate(&mut self, session: SessionId, page: Page, uploads: &Uploads) -> PageView {
        debug!("Evaluating page {:?} for session {session}", page);
        match page {
            Page::Home => self.home_page(),
            Page::Ingestion => self.ingestion_page(session, uploads),
            Page::Summary => self.summary_page(session),
            Page::About => self.about_page(),
        }
    }

    /// Ingests both uploads, merges them, and stores the result in the
    /// session. A failure leaves the session's previous table in place.
    pub fn merge_uploads(
        &mut self,
        session: SessionId,
        first: &Upload,
        second: &Upload,
    ) -> DashboardResult<&Table> {
        let left = ingest::read_csv(
            &first.bytes,
            Source::First,
            &self.settings.ingest_options(&first.name),
        )?;
        let right = ingest::read_csv(
            &second.bytes,
            Source::Second,
            &self.settings.ingest_options(&second.name),
        )?;
        let merged = merge::outer_merge(&left, &right, &self.settings.merge)?;
        Ok(self.store.store_merged(session, merged))
    }

    /// Summary of the session's merged table, or [`Notice::MissingData`].
    pub fn summary(&self, session: SessionId) -> Result<Summary, Notice> {
        let table = self.store.merged(session).ok_or(Notice::MissingData)?;
        Ok(summary::summarize(table, &self.settings.value_column))
    }

    fn home_page(&self) -> PageView {
        let mut view = PageView::new(Page::Home);
        view.push(Block::Text(
            "Welcome to the Pharmaceutical Data Dashboard!".to_string(),
        ))
        .push(Block::Text(format!(
            "This tool lets you upload two CSV files, merge them on a common key (currently `{}`), \
             and summarize your data all in one place.",
            self.settings.merge.key
        )));
        view
    }

    fn ingestion_page(&mut self, session: SessionId, uploads: &Uploads) -> PageView {
        let mut view = PageView::new(Page::Ingestion);
        view.push(Block::Text(format!(
            "Upload your CSV data sources below. Both sources are merged on the common key `{}`.",
            self.settings.merge.key
        )));
        let Some((first, second)) = uploads.both() else {
            view.push(Block::Info(Notice::AwaitingUploads.to_string()));
            return view;
        };
        let preview_rows = self.settings.preview_rows;
        match self.merge_uploads(session, first, second) {
            Ok(merged) => {
                let preview = Block::table(merged, Some(preview_rows));
                view.push(Block::Success(
                    "Data loaded and merged successfully!".to_string(),
                ))
                .push(preview);
            }
            Err(err) => {
                warn!("Merge failed for session {session}: {err}");
                view.push(Block::Error(err.user_message()));
            }
        }
        view
    }

    fn summary_page(&self, session: SessionId) -> PageView {
        let mut view = PageView::new(Page::Summary);
        let Some(merged) = self.store.merged(session) else {
            view.push(Block::Warning(Notice::MissingData.to_string()));
            return view;
        };
        view.push(Block::table(merged, None));

        let summary = summary::summarize(merged, &self.settings.value_column);
        match (summary.total, &summary.notice) {
            (Some(total), _) => {
                view.push(Block::Metric {
                    label: "Total Value".to_string(),
                    value: format_thousands(total),
                });
            }
            (None, Some(notice)) => {
                view.push(Block::Info(notice.to_string()));
            }
            (None, None) => {}
        }

        view.push(Block::Subheader("Summary Statistics".to_string()));
        if summary.statistics.is_empty() {
            view.push(Block::Info("The merged table has no columns to describe.".to_string()));
        } else {
            let (headers, rows) = summary.statistics.to_table();
            let align = std::iter::once(Align::Left)
                .chain(std::iter::repeat(Align::Right))
                .take(headers.len())
                .collect();
            view.push(Block::Table {
                headers,
                rows,
                align,
            });
        }
        view
    }

    fn about_page(&self) -> PageView {
        let mut view = PageView::new(Page::About);
        view.push(Block::Text(
            "This dashboard integrates multiple data sources into a single, unified view \
             (a 'source of truth') for a pharmaceutical product. Upload CSV files, merge them \
             on a common key, and review summaries of the combined data."
                .to_string(),
        ))
        .push(Block::Text("Key features:".to_string()))
        .push(Block::Text(
            "- Data Ingestion: upload two data sources.".to_string(),
        ))
        .push(Block::Text(
            "- Data Integration: full outer merge on a shared identifier.".to_string(),
        ))
        .push(Block::Text(
            "- Data Summary: total value and descriptive statistics.".to_string(),
        ));
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploads(first: &str, second: &str) -> Uploads {
        Uploads {
            first: Some(Upload::new("first.csv", first)),
            second: Some(Upload::new("second.csv", second)),
        }
    }

    fn example() -> Uploads {
        uploads(
            "product_id,name\n1,A\n2,B\n",
            "product_id,value\n2,10\n3,20\n",
        )
    }

    fn dashboard() -> (Dashboard, SessionId) {
        let mut dashboard = Dashboard::new(Settings::default());
        let session = dashboard.open_session();
        (dashboard, session)
    }

    #[test]
    fn page_names_parse_with_aliases() {
        assert_eq!("Data Ingestion".parse::<Page>(), Ok(Page::Ingestion));
        assert_eq!("data-summary".parse::<Page>(), Ok(Page::Summary));
        assert_eq!("HOME".parse::<Page>(), Ok(Page::Home));
        assert!("settings".parse::<Page>().is_err());
        assert_eq!(Page::default(), Page::Home);
    }

    #[test]
    fn ingestion_without_both_uploads_prompts() {
        let (mut dashboard, session) = dashboard();
        let partial = Uploads {
            first: Some(Upload::new("a.csv", "product_id\n1\n")),
            second: None,
        };
        let view = dashboard.evaluate(session, Page::Ingestion, &partial);
        assert!(view.blocks.contains(&Block::Info(Notice::AwaitingUploads.to_string())));
        assert!(dashboard.merged(session).is_none());
    }

    #[test]
    fn ingestion_merges_and_previews() {
        let (mut dashboard, session) = dashboard();
        let view = dashboard.evaluate(session, Page::Ingestion, &example());
        assert!(view.blocks.iter().any(|b| matches!(b, Block::Success(_))));
        assert_eq!(view.tables().count(), 1);
        assert_eq!(dashboard.merged(session).unwrap().row_count(), 3);
    }

    #[test]
    fn preview_is_limited_to_configured_rows() {
        let settings = Settings {
            preview_rows: 2,
            ..Settings::default()
        };
        let mut dashboard = Dashboard::new(settings);
        let session = dashboard.open_session();
        let view = dashboard.evaluate(session, Page::Ingestion, &example());
        let Some(Block::Table { rows, .. }) = view.tables().next() else {
            panic!("expected preview table");
        };
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn summary_before_merge_warns_without_table() {
        let (mut dashboard, session) = dashboard();
        let view = dashboard.evaluate(session, Page::Summary, &Uploads::default());
        assert!(view.blocks.contains(&Block::Warning(Notice::MissingData.to_string())));
        assert_eq!(view.tables().count(), 0);
        assert_eq!(view.errors().count(), 0);
    }

    #[test]
    fn summary_shows_total_value_metric() {
        let (mut dashboard, session) = dashboard();
        dashboard.evaluate(session, Page::Ingestion, &example());
        let view = dashboard.evaluate(session, Page::Summary, &Uploads::default());
        assert!(view.blocks.contains(&Block::Metric {
            label: "Total Value".to_string(),
            value: "30".to_string(),
        }));
        assert_eq!(view.tables().count(), 2);
    }

    #[test]
    fn summary_without_value_column_shows_notice() {
        let (mut dashboard, session) = dashboard();
        let data = uploads("product_id,name\n1,A\n", "product_id,qty\n1,4\n");
        dashboard.evaluate(session, Page::Ingestion, &data);
        let view = dashboard.evaluate(session, Page::Summary, &Uploads::default());
        assert!(
            view.blocks
                .contains(&Block::Info(Notice::MissingColumn("value".into()).to_string()))
        );
        assert!(!view.blocks.iter().any(|b| matches!(b, Block::Metric { .. })));
        assert_eq!(view.errors().count(), 0);
    }

    #[test]
    fn failed_merge_keeps_previous_table() {
        let (mut dashboard, session) = dashboard();
        dashboard.evaluate(session, Page::Ingestion, &example());
        let broken = uploads("", "product_id,value\n1,2\n");
        let view = dashboard.evaluate(session, Page::Ingestion, &broken);
        let errors = view.errors().collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error processing data: could not parse data source 1"));
        assert_eq!(dashboard.merged(session).unwrap().row_count(), 3);
    }

    #[test]
    fn missing_key_is_reported_on_page() {
        let (mut dashboard, session) = dashboard();
        let data = uploads("sku,name\n1,A\n", "product_id,value\n1,2\n");
        let view = dashboard.evaluate(session, Page::Ingestion, &data);
        assert_eq!(
            view.errors().collect::<Vec<_>>(),
            vec!["Error processing data: key column 'product_id' not found in data source 1"]
        );
        assert!(dashboard.merged(session).is_none());
    }

    #[test]
    fn render_prints_blocks_in_order() {
        let (mut dashboard, session) = dashboard();
        let text = dashboard
            .evaluate(session, Page::Home, &Uploads::default())
            .render();
        assert!(text.starts_with("== Pharmaceutical Data Dashboard ==\n"));
        assert!(text.contains("== Home =="));
        assert!(text.contains("product_id"));
    }

    #[test]
    fn every_page_renders_without_errors() {
        let (mut dashboard, session) = dashboard();
        for page in Page::ALL {
            let view = dashboard.evaluate(session, page, &Uploads::default());
            assert_eq!(view.page, page);
            assert_eq!(view.errors().count(), 0);
        }
    }
}
