use super::manifest::PatchRecord;

/// Computes the records pending application: everything strictly newer than
/// the watermark, in ascending version order.
///
/// Ascending order is what keeps the watermark contiguous when a session is
/// interrupted mid-plan, and guarantees an update never lands before an
/// earlier one it may depend on. The sort is stable, so equal versions keep
/// their manifest order; duplicate pairs are kept as authored, since
/// reapplying an identical file is a harmless full overwrite.
pub fn plan_updates(records: Vec<PatchRecord>, watermark: u64) -> Vec<PatchRecord> {
    let mut pending: Vec<PatchRecord> = records
        .into_iter()
        .filter(|record| record.version > watermark)
        .collect();
    pending.sort_by_key(|record| record.version);
    pending
}
