//! Pure domain logic for the procurement-notice matching funnel: OCDS release
//! normalisation, CPV/geo/theme scoring, UKCAT activity tagging, material
//! change detection, and renewal-cycle estimation. No I/O lives here — every
//! function takes plain data in and returns plain data out.

pub mod activity_tagger;
pub mod change_detector;
pub mod cpv;
pub mod funnel;
pub mod geo;
pub mod ocds;
pub mod renewal;
pub mod theme;
pub mod types;

pub use change_detector::{diff as diff_notice, messages as change_messages, Changes, NoticeSnapshot};
pub use funnel::{evaluate as run_funnel, DeepVerdict};
pub use ocds::{normalise_buyer, normalise_release, BuyerPatch, NoticePatch};
pub use renewal::{estimate_cycle_years, summarise as summarise_renewal, HistoricalAward, RenewalSummary};
pub use types::{
	CandidateNotice, CandidateProfile, GateOutcome, Lot, RejectStage, ScoredMatch, Suitability, Verdict,
};
