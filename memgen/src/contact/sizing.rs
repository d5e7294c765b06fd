//! Contact sizing searches.
//!
//! Every search draws trial [`Contact`]s rather than dividing a span by the cut
//! pitch, since footprint growth depends on the enclosure rules of each stack.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use derive_builder::Builder;
use memgeom::{div_ceil, Dir};

use super::{Contact, ContactParams, Implant};
use crate::layers::LayerStack;
use crate::rules::{RuleDeck, RuleError, ViaRules};
use crate::{debug, trace};

/// Parameters of a contact count search.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Builder)]
pub struct ContactSearch {
    stack: LayerStack,
    /// Overrides the cut-to-cut spacing used for the initial estimate.
    #[builder(default, setter(strip_option))]
    spacing: Option<i64>,
    #[builder(default, setter(strip_option))]
    implant: Option<Implant>,
    /// The relaxed direction of the trial contacts.
    #[builder(default = "Dir::Vert")]
    dir: Dir,
}

impl ContactSearch {
    #[inline]
    pub fn builder() -> ContactSearchBuilder {
        ContactSearchBuilder::default()
    }

    /// A search over `stack` with default settings.
    pub fn new(stack: LayerStack) -> Self {
        Self {
            stack,
            spacing: None,
            implant: None,
            dir: Dir::Vert,
        }
    }

    #[inline]
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    fn pitch(&self, rules: &ViaRules) -> i64 {
        rules.size + self.spacing.unwrap_or(rules.space)
    }

    fn params(&self, rows: usize) -> ContactParams {
        ContactParams::column(self.stack.clone(), rows, self.dir, self.implant)
    }
}

/// A body contact and the width of the active region around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyContact {
    pub contact: Arc<Contact>,
    pub active_width: i64,
}

/// Sizes and memoizes contacts against a shared [`RuleDeck`].
pub struct ContactSizer {
    rules: Arc<dyn RuleDeck>,
    contacts: RwLock<HashMap<ContactParams, Arc<Contact>>>,
    max_contacts: RwLock<HashMap<(LayerStack, i64), Arc<Contact>>>,
}

impl std::fmt::Debug for ContactSizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactSizer").finish_non_exhaustive()
    }
}

impl ContactSizer {
    pub fn new(rules: Arc<dyn RuleDeck>) -> Self {
        Self {
            rules,
            contacts: RwLock::new(HashMap::new()),
            max_contacts: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn rules(&self) -> &Arc<dyn RuleDeck> {
        &self.rules
    }

    /// Returns the contact described by `params`, drawing it on first use.
    pub fn contact(&self, params: &ContactParams) -> Result<Arc<Contact>, RuleError> {
        if let Some(c) = self
            .contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(params)
        {
            return Ok(c.clone());
        }
        let via = self.via_rules(&params.stack)?;
        let contact = Arc::new(Contact::new(params.clone(), &via));
        let mut map = self
            .contacts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(params.clone()).or_insert(contact).clone())
    }

    fn via_rules(&self, stack: &LayerStack) -> Result<ViaRules, RuleError> {
        let via = self.rules.via(stack)?;
        if via.size <= 0 || via.pitch() <= 0 {
            return Err(RuleError::InvalidVia {
                stack: stack.clone(),
                reason: "cut pitch must be positive",
            });
        }
        Ok(via)
    }

    /// Runs the downward search, returning the count and the last trial contact.
    fn search(
        &self,
        span: i64,
        search: &ContactSearch,
    ) -> Result<(usize, Option<Arc<Contact>>), RuleError> {
        let via = self.via_rules(&search.stack)?;
        let pitch = search.pitch(&via);
        if pitch <= 0 {
            return Err(RuleError::InvalidVia {
                stack: search.stack.clone(),
                reason: "cut pitch must be positive",
            });
        }
        if span <= 0 {
            return Ok((0, None));
        }

        let estimate = div_ceil(span, pitch) as usize;
        let mut n = estimate;
        while n > 1 {
            let trial = self.contact(&search.params(n))?;
            if trial.bot_footprint().height() < span && trial.top_footprint().height() < span {
                trace!("{} cuts of {} fit in span {}", n, search.stack, span);
                return Ok((n, Some(trial)));
            }
            n -= 1;
        }
        if estimate > 1 {
            debug!(
                "falling back to a single cut of {} for span {} (estimated {})",
                search.stack, span, estimate
            );
        }
        Ok((1, None))
    }

    /// The largest number of cuts in a single column whose footprint on both
    /// layers of the stack fits within `span`.
    ///
    /// Never fails to produce a usable count for a positive span: if not even
    /// two cuts fit, the result is 1. Returns 0 only when `span` is not positive.
    pub fn num_contacts(&self, span: i64, search: &ContactSearch) -> Result<usize, RuleError> {
        Ok(self.search(span, search)?.0)
    }

    /// The contact chosen by [`ContactSizer::num_contacts`], with at least one cut.
    pub fn sample_contact(
        &self,
        span: i64,
        search: &ContactSearch,
    ) -> Result<Arc<Contact>, RuleError> {
        match self.search(span, search)? {
            (_, Some(contact)) => Ok(contact),
            (_, None) => self.contact(&search.params(1)),
        }
    }

    /// The tallest single-column contact of `stack` whose height does not exceed `height`.
    ///
    /// Returns the single-cut contact if even that is too tall. Results are
    /// memoized per `(stack, height)`.
    pub fn max_contact(&self, stack: &LayerStack, height: i64) -> Result<Arc<Contact>, RuleError> {
        let key = (stack.clone(), height);
        if let Some(c) = self
            .max_contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(c.clone());
        }

        let search = ContactSearch::new(stack.clone());
        let mut best = self.contact(&search.params(1))?;
        let mut n = 2;
        loop {
            let trial = self.contact(&search.params(n))?;
            if trial.height() > height {
                break;
            }
            best = trial;
            n += 1;
        }
        trace!(
            "tallest {} contact within {} has {} cuts",
            stack,
            height,
            best.rows()
        );

        let mut map = self
            .max_contacts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(key).or_insert(best).clone())
    }

    /// Sizes a body contact for an active region of the given width and height.
    ///
    /// The contact is sized for `width` less one cut pitch. The returned active
    /// width covers the contact footprint, the minimum-area rule of the bottom
    /// layer and the requested width.
    pub fn contact_width(
        &self,
        width: i64,
        active_height: i64,
        search: &ContactSearch,
    ) -> Result<BodyContact, RuleError> {
        let via = self.via_rules(&search.stack)?;
        let contact = self.sample_contact(width - search.pitch(&via), search)?;
        let extent = contact.bot_footprint().height();
        let min_area = self.rules.min_area(&search.stack.bot)?;
        let min_width = if active_height > 0 {
            div_ceil(min_area, active_height)
        } else {
            0
        };
        let active_width = extent.max(min_width).max(width);
        Ok(BodyContact {
            contact,
            active_width,
        })
    }
}
