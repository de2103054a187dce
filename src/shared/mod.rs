pub mod geo;
pub mod time;

pub use geo::*;
pub use time::*;

use std::sync::Arc;

/// Anything stored in the runtime index under a stable string id.
pub trait Identifiable {
    fn id(&self) -> &Arc<str>;
}

/// Splits a `Operator.Railway.Number` style train id into its railway
/// prefix and train number.
pub fn split_train_id(id: &str) -> Option<(&str, &str)> {
    let (railway, number) = id.rsplit_once('.')?;
    if railway.is_empty() || number.is_empty() || !railway.contains('.') {
        return None;
    }
    Some((railway, number))
}

#[test]
fn split_train_id_test() {
    assert_eq!(
        split_train_id("JR-East.Yamanote.301G"),
        Some(("JR-East.Yamanote", "301G"))
    );
    assert_eq!(split_train_id("Yamanote.301G"), None);
    assert_eq!(split_train_id("JR-East.Yamanote."), None);
}
