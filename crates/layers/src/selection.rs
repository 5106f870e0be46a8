//! Per-layer selection state: a transient hover focus and a pinned sticky
//! footprint.
//!
//! Transitions are pure. Each returns the effects the owner must carry out
//! (notify, recentre, redraw); nothing here touches rendering or other layers.

use footprints::{Footprint, FootprintId};
use foundation::GeoBounds;
use foundation::math::Projection;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Focused,
    Stickied,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEffect {
    FocusChanged(Option<FootprintId>),
    StickyChanged(Option<FootprintId>),
    /// Pan so these bounds are centred.
    Recenter(GeoBounds),
    /// The layer's emphasized footprints changed.
    Redraw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    focused: Option<FootprintId>,
    sticky: Option<FootprintId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<&FootprintId> {
        self.focused.as_ref()
    }

    pub fn sticky(&self) -> Option<&FootprintId> {
        self.sticky.as_ref()
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.sticky.is_some() {
            SelectionPhase::Stickied
        } else if self.focused.is_some() {
            SelectionPhase::Focused
        } else {
            SelectionPhase::Idle
        }
    }

    /// Sets the hover focus. No effects when it does not change.
    pub fn focus(&mut self, hit: Option<FootprintId>) -> Vec<SelectionEffect> {
        if self.focused == hit {
            return Vec::new();
        }
        self.focused = hit.clone();
        vec![SelectionEffect::FocusChanged(hit), SelectionEffect::Redraw]
    }

    /// Pointer left the render surface.
    pub fn leave(&mut self) -> Vec<SelectionEffect> {
        self.focus(None)
    }

    /// What a click on `hit` should make sticky: clicking the current sticky
    /// footprint again toggles it off.
    pub fn click_target(&self, hit: Option<FootprintId>) -> Option<FootprintId> {
        if hit.is_some() && hit == self.sticky {
            None
        } else {
            hit
        }
    }

    /// Pins `footprint` (or clears the pin).
    ///
    /// In the geographic projection a newly pinned footprint whose bounds are
    /// not already inside `viewport` also yields a single [`SelectionEffect::Recenter`].
    pub fn stick(
        &mut self,
        footprint: Option<&Footprint>,
        viewport: &GeoBounds,
        projection: Projection,
    ) -> Vec<SelectionEffect> {
        let next = footprint.map(|f| f.id.clone());
        if self.sticky == next {
            return Vec::new();
        }
        self.sticky = next.clone();

        let mut effects = vec![SelectionEffect::StickyChanged(next)];
        if projection == Projection::Geographic
            && let Some(bounds) = footprint.and_then(Footprint::bounds)
            && bounds.is_valid()
            && !viewport.contains(&bounds)
        {
            effects.push(SelectionEffect::Recenter(bounds));
        }
        effects.push(SelectionEffect::Redraw);
        effects
    }

    /// Drops the pin without touching focus. Used when another layer takes it.
    pub fn clear_sticky(&mut self) -> Vec<SelectionEffect> {
        if self.sticky.take().is_none() {
            return Vec::new();
        }
        vec![SelectionEffect::StickyChanged(None), SelectionEffect::Redraw]
    }

    /// A footprint was excluded from the results: forget any reference to it.
    pub fn exclude(&mut self, id: &FootprintId) -> Vec<SelectionEffect> {
        let mut effects = Vec::new();
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
            effects.push(SelectionEffect::FocusChanged(None));
        }
        if self.sticky.as_ref() == Some(id) {
            self.sticky = None;
            effects.push(SelectionEffect::StickyChanged(None));
        }
        if !effects.is_empty() {
            effects.push(SelectionEffect::Redraw);
        }
        effects
    }
}
