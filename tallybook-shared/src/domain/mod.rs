/// Pure domain logic
///
/// Nothing in this module touches the database or network; handlers load
/// rows through [`crate::models`] and hand them to these functions.
///
/// # Modules
///
/// - [`money`]: Currency rounding
/// - [`period`]: UTC date windows and date parsing
/// - [`aggregation`]: Finance totals, dashboard summary, sales aggregates
/// - [`export`]: Financial CSV export
/// - [`insights`]: Rule-based sales insights
/// - [`slug`]: Company slug derivation

pub mod aggregation;
pub mod export;
pub mod insights;
pub mod money;
pub mod period;
pub mod slug;
