//! Rules for several keys sharing one address.

use super::ports::PortSet;
use super::table::Assignment;

/// Decide whether a request may join the existing holders of an address.
///
/// Returns the first holder that blocks the request, or `None` if the
/// request is admitted. An address with no holders admits anything. A
/// non-empty holder set admits only a request whose sharing key is non-empty
/// and equal to every holder's, and whose ports overlap none of theirs.
pub fn blocking_holder<'a>(
    holders: &[&'a Assignment],
    ports: &PortSet,
    sharing_key: &str,
) -> Option<&'a Assignment> {
    holders.iter().copied().find(|existing| {
        sharing_key.is_empty()
            || existing.sharing_key.is_empty()
            || existing.sharing_key != sharing_key
            || existing.ports.conflicts_with(ports)
    })
}
