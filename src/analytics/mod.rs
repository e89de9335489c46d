pub mod chart;
pub mod conversation_volume;
pub mod dashboard;
pub mod dataset;
pub mod date_filter;
pub mod default_responses;
pub mod export;
pub mod form_funnel;
pub mod frequency;
pub mod hot_topics;
pub mod language;
pub mod panel;
pub mod satisfaction;
pub mod theme_breakdown;
pub mod transcript_scanner;
pub mod url_device;

pub use dashboard::{build_dashboard, Dashboard, DashboardSection, DashboardSettings, SectionBody};
pub use dataset::{Column, ConversationRecord, Dataset};
pub use date_filter::{apply_date_filter, DateRange, DateSelection, FilterNotice, FilterOutcome};
pub use export::*;
pub use panel::{Panel, PanelError, PanelKind, PanelResult};
pub use transcript_scanner::{ScannerConfig, TranscriptScan};
