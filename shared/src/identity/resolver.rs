use log::trace;

use crate::{
    identity::{error::MappingError, mapping_entry::MappingEntry, mapping_store::IdentityMappingStore},
    EntityCatalog, Handle,
};

/// Outcome of one re-resolution pass over the unresolved mapping entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: usize,
    pub pending: usize,
}

/// Binds every unresolved entry whose entity is currently observable in `catalog`.
///
/// Entries that cannot be matched yet stay unresolved; deferred operations that
/// depend on them keep waiting and are retried on the next drain.
pub fn resolve_pending(
    store: &IdentityMappingStore,
    catalog: &dyn EntityCatalog,
) -> Result<ResolutionReport, MappingError> {
    let mut report = ResolutionReport::default();
    for entry in store.unresolved()? {
        match find_local_handle(catalog, &entry) {
            Some(local) => {
                store.bind_local(&entry.address, local)?;
                trace!("Resolved {} at {} to local handle {}", entry.stable_id, entry.address, local);
                report.resolved += 1;
            }
            None => report.pending += 1,
        }
    }
    Ok(report)
}

/// Looks for the local counterpart of `entry` among the children of its parent.
pub fn find_local_handle(catalog: &dyn EntityCatalog, entry: &MappingEntry) -> Option<Handle> {
    let children = catalog.children(entry.address.parent);

    // same slot first, then anywhere under the parent if lanes were reordered
    children
        .iter()
        .find(|(sub_index, candidate)| {
            *sub_index == entry.address.sub_index && entry.stable_id.matches(candidate)
        })
        .or_else(|| {
            children
                .iter()
                .find(|(_, candidate)| entry.stable_id.matches(candidate))
        })
        .map(|(_, candidate)| candidate.handle)
}
