//! Metadata filters for locating fields.

use crate::header::FieldHeader;
use crate::time::ValidityFn;

/// Criteria a field header must meet. Unset criteria match every field.
///
/// Text criteria match when the stored, space-padded value equals the
/// criterion padded to the same width; a criterion longer than the stored
/// width never matches.
///
/// ```
/// use field_store::FieldFilter;
///
/// let filter = FieldFilter::new().nomvar("TT").ip1(850);
/// assert_eq!(filter.ip1, Some(850));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    /// Validity time as computed by the session's validity function.
    pub datev: Option<i64>,
    pub ip1: Option<i32>,
    pub ip2: Option<i32>,
    pub ip3: Option<i32>,
    pub typvar: Option<String>,
    pub nomvar: Option<String>,
    pub etiket: Option<String>,
}

impl FieldFilter {
    /// A filter that matches every field.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datev(mut self, datev: i64) -> Self {
        self.datev = Some(datev);
        self
    }

    pub fn ip1(mut self, ip1: i32) -> Self {
        self.ip1 = Some(ip1);
        self
    }

    pub fn ip2(mut self, ip2: i32) -> Self {
        self.ip2 = Some(ip2);
        self
    }

    pub fn ip3(mut self, ip3: i32) -> Self {
        self.ip3 = Some(ip3);
        self
    }

    pub fn typvar(mut self, typvar: impl Into<String>) -> Self {
        self.typvar = Some(typvar.into());
        self
    }

    pub fn nomvar(mut self, nomvar: impl Into<String>) -> Self {
        self.nomvar = Some(nomvar.into());
        self
    }

    pub fn etiket(mut self, etiket: impl Into<String>) -> Self {
        self.etiket = Some(etiket.into());
        self
    }

    /// Test one header. `validity` is only evaluated when a validity time
    /// criterion is set.
    pub fn matches(&self, header: &FieldHeader, validity: &ValidityFn) -> bool {
        if let Some(datev) = self.datev {
            if validity(header.dateo, header.deet, header.npas) != datev {
                return false;
            }
        }

        matches_int(self.ip1, header.ip1)
            && matches_int(self.ip2, header.ip2)
            && matches_int(self.ip3, header.ip3)
            && matches_text(self.typvar.as_deref(), &header.typvar)
            && matches_text(self.nomvar.as_deref(), &header.nomvar)
            && matches_text(self.etiket.as_deref(), &header.etiket)
    }
}

fn matches_int(wanted: Option<i32>, stored: i32) -> bool {
    wanted.map_or(true, |w| w == stored)
}

fn matches_text(wanted: Option<&str>, stored: &[u8]) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    let wanted = wanted.as_bytes();
    if wanted.len() > stored.len() {
        return false;
    }
    let (head, tail) = stored.split_at(wanted.len());
    head == wanted && tail.iter().all(|&b| b == b' ')
}
