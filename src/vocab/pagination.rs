use crate::{
    core::{
        VocabItem,
        VocabotError,
    },
    vocab::VocabIndex,
};

pub const PAGE_SIZE: usize = 20;

/// One window of a unit's word list.
#[derive(Debug)]
pub struct UnitPage<'a> {
    pub unit_no: u32,
    pub page: usize,
    pub max_page: usize,
    /// 0-based offset of the first item within the unit.
    pub start: usize,
    /// Word count of the whole unit.
    pub total: usize,
    pub items: Vec<&'a VocabItem>,
}

/// Returns the requested page of a unit, clamping the page number into
/// `[1, max_page]`. An empty unit is a `NotFound`, not an empty page.
pub fn page_unit(
    index: &VocabIndex,
    unit_no: u32,
    requested_page: usize,
) -> Result<UnitPage<'_>, VocabotError> {
    let items = index.by_unit(unit_no);
    if items.is_empty() {
        return Err(VocabotError::NotFound(format!("Unit {} not found or empty.", unit_no)));
    }

    let total = items.len();
    let max_page = total.div_ceil(PAGE_SIZE).max(1);
    let page = requested_page.clamp(1, max_page);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total);

    Ok(UnitPage { unit_no, page, max_page, start, total, items: items[start..end].to_vec() })
}
