//! Free-interval search along one axis of a layer.

use derive_builder::Builder;
use memgeom::{Dir, Span};

use crate::layers::Layer;
use crate::module::Module;
use crate::trace;

/// Parameters of a clearance search.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ClearanceQuery {
    #[builder(setter(into))]
    pub layer: Layer,
    /// The scan axis. Returned intervals are coordinates along this direction.
    pub dir: Dir,
    /// The band of interest along the perpendicular axis.
    pub band: Span,
    /// Extra occupied intervals along the scan axis.
    #[builder(default)]
    pub exclusions: Vec<Span>,
    /// The scanned range. Defaults to the extent of the module along the scan axis.
    #[builder(default, setter(strip_option))]
    pub domain: Option<Span>,
}

impl ClearanceQuery {
    #[inline]
    pub fn builder() -> ClearanceQueryBuilder {
        ClearanceQueryBuilder::default()
    }

    fn domain(&self, module: &Module) -> Option<Span> {
        if let Some(domain) = self.domain {
            return Some(domain);
        }
        let rect = module.bbox().into_rect()?;
        Some(rect.span(self.dir))
    }
}

/// The merged occupied intervals within the domain of `query`, sorted ascending.
///
/// Shapes on the query layer occupy their extent along the scan axis if they
/// overlap the band with positive length. Intervals that touch are merged.
pub fn occupied(module: &Module, query: &ClearanceQuery) -> Vec<Span> {
    let Some(domain) = query.domain(module) else {
        return Vec::new();
    };
    let across = query.dir.other();
    let shapes = module
        .shapes_on(&query.layer)
        .filter(|rect| rect.span(across).overlaps(&query.band))
        .map(|rect| rect.span(query.dir));
    let merged = Span::merge_adjacent(
        shapes.chain(query.exclusions.iter().copied()),
        |cur, next| next.start() <= cur.stop(),
    );
    merged
        .filter_map(|span| span.intersection(&domain))
        .filter(|span| span.length() > 0)
        .collect()
}

/// Returns the free intervals on `query.layer` along `query.dir`, sorted ascending.
///
/// Intervals narrower than any particular via or fill are still reported;
/// callers filter by their own minimum usable width.
pub fn find_clearances(module: &Module, query: &ClearanceQuery) -> Vec<Span> {
    let Some(domain) = query.domain(module) else {
        return Vec::new();
    };
    let occupied = occupied(module, query);
    let mut free = Vec::with_capacity(occupied.len() + 1);
    let mut cursor = domain.start();
    for span in occupied {
        if span.start() > cursor {
            free.push(Span::new(cursor, span.start()));
        }
        cursor = cursor.max(span.stop());
    }
    if cursor < domain.stop() {
        free.push(Span::new(cursor, domain.stop()));
    }
    trace!(
        "clearances on {} in band {} of {}: {:?}",
        query.layer,
        query.band,
        module.name(),
        free
    );
    free
}
