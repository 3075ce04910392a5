#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement system that turns cannon selections into placed cannons.
//!
//! Selecting a cannon acquires a preview instance and sets its cost aside in
//! the ledger. The preview follows the pointer over placeable surfaces and is
//! activated on confirmation, at which point the held coins are debited. At
//! most one preview exists at a time.

use cannon_defence_core::{CannonHandle, CannonKind, Event, PlacementInput, PlacementRejection, Surface, Vec3};
use cannon_defence_system_economy::{Hold, Ledger};
use cannon_defence_world::CannonRegistry;
use tracing::{debug, error, warn};

#[derive(Debug)]
struct Preview {
    handle: CannonHandle,
    cost: u32,
    hold: Option<Hold>,
}

/// Coordinates the single pending placement preview.
#[derive(Debug, Default)]
pub struct PlacementCoordinator {
    preview: Option<Preview>,
}

impl PlacementCoordinator {
    /// Creates a coordinator with no preview.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a preview for `kind`, replacing a preview of another kind.
    ///
    /// Selecting the kind that is already previewed returns the existing
    /// preview. Unaffordable selections are rejected without any state change.
    pub fn select(
        &mut self,
        kind: CannonKind,
        cannons: &mut CannonRegistry,
        ledger: &mut Ledger,
        out: &mut Vec<Event>,
    ) -> Result<CannonHandle, PlacementRejection> {
        let Some(config) = cannons.template(kind) else {
            error!(?kind, "no cannon config registered for kind");
            return reject(Some(kind), PlacementRejection::UnknownKind, out);
        };
        let cost = config.cost;

        if let Some(preview) = &self.preview {
            if preview.handle.kind() == kind {
                return Ok(preview.handle);
            }
        }

        let reclaimable = self
            .preview
            .as_ref()
            .and_then(|preview| preview.hold.as_ref())
            .map_or(0, Hold::amount);
        if ledger.available().saturating_add(reclaimable) < cost {
            warn!(?kind, cost, balance = ledger.balance(), "cannot afford cannon");
            return reject(Some(kind), PlacementRejection::InsufficientFunds, out);
        }

        let _ = self.clear(cannons, ledger, out);

        let Some(handle) = cannons.acquire(kind, Vec3::ZERO, None) else {
            return reject(Some(kind), PlacementRejection::Unavailable, out);
        };
        if let Some(cannon) = cannons.get_mut(handle) {
            cannon.prepare_preview();
        }
        let hold = match ledger.hold(cost) {
            Ok(hold) => hold,
            Err(error) => {
                warn!(?kind, %error, "failed to reserve coins for preview");
                let _ = cannons.release(handle);
                return reject(Some(kind), PlacementRejection::InsufficientFunds, out);
            }
        };

        debug!(?kind, cost, "placement preview created");
        self.preview = Some(Preview {
            handle,
            cost,
            hold: Some(hold),
        });
        out.push(Event::PreviewCreated { cannon: handle });
        Ok(handle)
    }

    /// Moves the preview to the pointer when it rests on a placeable surface.
    pub fn hover(&mut self, input: PlacementInput, cannons: &mut CannonRegistry) -> bool {
        let Some(preview) = &self.preview else {
            return false;
        };
        input.accepts_placement() && cannons.set_position(preview.handle, input.position)
    }

    /// Places the preview at the pointer and debits its cost.
    ///
    /// On any rejection the preview is retained so the player can try again.
    pub fn confirm(
        &mut self,
        input: PlacementInput,
        cannons: &mut CannonRegistry,
        ledger: &mut Ledger,
        out: &mut Vec<Event>,
    ) -> Result<CannonHandle, PlacementRejection> {
        let Some(preview) = self.preview.as_mut() else {
            return reject(None, PlacementRejection::NoPreview, out);
        };
        let kind = preview.handle.kind();
        if input.over_ui {
            return reject(Some(kind), PlacementRejection::OverUi, out);
        }
        if input.surface != Surface::Placeable {
            return reject(Some(kind), PlacementRejection::NotPlaceable, out);
        }

        let payment = match preview.hold.take() {
            Some(hold) => ledger.commit(hold, out),
            None => ledger.spend(preview.cost, out),
        };
        if let Err(error) = payment {
            warn!(?kind, %error, "placement payment failed");
            return reject(Some(kind), PlacementRejection::InsufficientFunds, out);
        }

        let handle = preview.handle;
        self.preview = None;
        let _ = cannons.set_position(handle, input.position);
        if let Some(cannon) = cannons.get_mut(handle) {
            let _ = cannon.activate();
        }
        debug!(?kind, position = ?input.position, "cannon placed");
        out.push(Event::CannonPlaced {
            cannon: handle,
            position: input.position,
        });
        out.push(Event::PlacementReleased);
        Ok(handle)
    }

    /// Discards the preview and returns its held coins.
    ///
    /// Returns `false` when no preview exists.
    pub fn clear(
        &mut self,
        cannons: &mut CannonRegistry,
        ledger: &mut Ledger,
        out: &mut Vec<Event>,
    ) -> bool {
        let Some(preview) = self.preview.take() else {
            return false;
        };
        let _ = cannons.release(preview.handle);
        if let Some(hold) = preview.hold {
            ledger.release_hold(hold);
        }
        out.push(Event::PlacementReleased);
        true
    }

    /// Handle of the pending preview.
    #[must_use]
    pub fn preview(&self) -> Option<CannonHandle> {
        self.preview.as_ref().map(|preview| preview.handle)
    }

    /// Coins currently set aside for the pending preview.
    #[must_use]
    pub fn held(&self) -> u32 {
        self.preview
            .as_ref()
            .and_then(|preview| preview.hold.as_ref())
            .map_or(0, Hold::amount)
    }
}

fn reject(
    kind: Option<CannonKind>,
    reason: PlacementRejection,
    out: &mut Vec<Event>,
) -> Result<CannonHandle, PlacementRejection> {
    out.push(Event::PlacementRejected { kind, reason });
    Err(reason)
}
