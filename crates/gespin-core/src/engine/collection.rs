use super::config::CollectionConfig;
use super::error::CollectionError;
use super::grid::SpatialGrid;
use super::journal::{Journal, JournalEntry, JournalState};
use crate::core::likelihood::{LikelihoodError, LikelihoodModel, UnitLikelihood};
use crate::core::models::cell::GridCell;
use crate::core::models::ids::NucleonId;
use crate::core::models::nucleon::{Nucleon, PairLikelihood};
use crate::core::utils::geometry::nearest_image_shift;
use nalgebra::{Point3, Vector3};
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

/// Everything needed to register a nucleon at a new position, evaluated up front so that a
/// failing likelihood function leaves the collection untouched.
struct Placement {
    position: Point3<f64>,
    cell: GridCell,
    single: f64,
    pairs: Vec<PairLikelihood>,
}

/// Refreshed factors for a move that stays inside the current bin.
struct InPlaceUpdate {
    position: Point3<f64>,
    single: f64,
    /// New value and image shift for each existing pair entry, in entry order.
    pairs: Vec<(f64, Vector3<f64>)>,
}

/// A population of nucleons in a periodic cube, binned on a uniform grid, with a running
/// likelihood kept current under every insertion, removal and move.
///
/// The likelihood is the product of one single-body factor per nucleon and one pairwise
/// factor per pair of nucleons whose bins lie within the pairwise reach of each other.
/// Every mutation divides out the factors it invalidates and multiplies in their
/// replacements, so the cost of a move is proportional to the size of its neighborhood
/// rather than to the size of the collection.
///
/// Members are owned by the collection and addressed by [`NucleonId`]. The insertion
/// order is preserved and forms the primary iteration view.
#[derive(Debug, Clone)]
pub struct NucleonCollection<M = UnitLikelihood> {
    /// Region geometry and pairwise reach.
    config: CollectionConfig,
    /// The pairwise reach expressed in bins.
    pairwise_units: usize,
    /// Bin membership of every member.
    grid: SpatialGrid,
    /// Storage for all members.
    nucleons: SlotMap<NucleonId, Nucleon>,
    /// Members in insertion order.
    ordered: Vec<NucleonId>,
    /// The running product of all single and pairwise factors.
    likelihood: f64,
    /// Recorded moves since the last checkpoint.
    journal: Journal,
    /// The scoring functions.
    model: M,
}

impl NucleonCollection<UnitLikelihood> {
    /// Creates an empty collection with the default geometry and unit likelihood factors.
    pub fn new() -> Self {
        Self::with_model(UnitLikelihood)
    }
}

impl Default for NucleonCollection<UnitLikelihood> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: LikelihoodModel> NucleonCollection<M> {
    /// Creates an empty collection with the default geometry.
    pub fn with_model(model: M) -> Self {
        Self::from_parts(CollectionConfig::default(), model)
    }

    /// Creates an empty collection with the given geometry.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Config`] if the configuration fails validation.
    pub fn with_config(config: CollectionConfig, model: M) -> Result<Self, CollectionError> {
        config.validate()?;
        Ok(Self::from_parts(config, model))
    }

    fn from_parts(config: CollectionConfig, model: M) -> Self {
        let pairwise_units = config.pairwise_units();
        debug!(
            "Creating nucleon collection: units={}, length={}, pairwise reach={} bins",
            config.units, config.length, pairwise_units
        );
        Self {
            grid: SpatialGrid::new(&config),
            config,
            pairwise_units,
            nucleons: SlotMap::with_key(),
            ordered: Vec::new(),
            likelihood: 1.0,
            journal: Journal::new(),
            model,
        }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn pairwise_units(&self) -> usize {
        self.pairwise_units
    }

    /// The current running likelihood.
    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, id: NucleonId) -> bool {
        self.nucleons.contains_key(id)
    }

    /// Member ids in insertion order.
    pub fn ids(&self) -> &[NucleonId] {
        &self.ordered
    }

    pub fn nucleon(&self, id: NucleonId) -> Option<&Nucleon> {
        self.nucleons.get(id)
    }

    /// Iterates over members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NucleonId, &Nucleon)> + '_ {
        self.ordered.iter().map(move |&id| (id, &self.nucleons[id]))
    }

    /// Looks up the bin that holds `position`.
    pub fn find_cube(&self, position: &Point3<f64>) -> GridCell {
        self.grid.find_cube(position)
    }

    /// Returns the id at a list position.
    ///
    /// Negative indices count from the end and wrap modulo the length.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::IndexOutOfRange`] if `index >= len` or the collection is empty.
    pub fn id_at(&self, index: isize) -> Result<NucleonId, CollectionError> {
        let slot = self.resolve_index(index)?;
        Ok(self.ordered[slot])
    }

    /// Returns the nucleon at a list position, with the same index rules as [`Self::id_at`].
    pub fn get(&self, index: isize) -> Result<&Nucleon, CollectionError> {
        let id = self.id_at(index)?;
        Ok(&self.nucleons[id])
    }

    /// Appends a copy of `nucleon` and returns the new member count.
    pub fn add_nucleon(&mut self, nucleon: &Nucleon) -> Result<usize, CollectionError> {
        self.insert_nucleon(nucleon, self.ordered.len())
    }

    /// Inserts a copy of `nucleon` at list position `slot` and returns the new member count.
    pub fn insert_nucleon(
        &mut self,
        nucleon: &Nucleon,
        slot: usize,
    ) -> Result<usize, CollectionError> {
        self.insert_existing_nucleon(nucleon.detached(), slot)
    }

    /// Takes ownership of `nucleon` and registers it at list position `slot`.
    ///
    /// The position is folded into the region, the single-body factor is evaluated and
    /// every nucleon in the neighboring bins gets a pairwise factor with it. Each new pair
    /// is multiplied into the likelihood once and cached on both endpoints. Any cached state
    /// the nucleon carried is discarded.
    ///
    /// # Return
    ///
    /// The new member count.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidSlot`] if `slot > len`, or a coordinate or
    /// likelihood error. On error the collection is unchanged.
    pub fn insert_existing_nucleon(
        &mut self,
        mut nucleon: Nucleon,
        slot: usize,
    ) -> Result<usize, CollectionError> {
        if slot > self.ordered.len() {
            return Err(CollectionError::InvalidSlot {
                slot,
                len: self.ordered.len(),
            });
        }

        nucleon.clear_registration();
        nucleon.position = self.grid.bring_inside_region(nucleon.position)?;
        let placement = self.evaluate_placement(None, &nucleon)?;

        let id = self.nucleons.insert(nucleon);
        self.link(id, slot, placement);

        trace!(
            "Inserted nucleon {:?} at slot {}. Likelihood: {:.6e}",
            id, slot, self.likelihood
        );
        Ok(self.ordered.len())
    }

    /// Unregisters a member and hands it back to the caller.
    ///
    /// Its single factor and every pair factor it takes part in are divided out of the
    /// likelihood, and the reciprocal entries are removed from its peers.
    ///
    /// # Return
    ///
    /// The detached nucleon and the list position it occupied.
    pub fn remove_nucleon(&mut self, id: NucleonId) -> Result<(Nucleon, usize), CollectionError> {
        if !self.nucleons.contains_key(id) {
            return Err(CollectionError::NucleonNotFound(id));
        }
        let slot = self.unlink(id);
        let mut nucleon = self
            .nucleons
            .remove(id)
            .ok_or(CollectionError::NucleonNotFound(id))?;
        nucleon.clear_registration();

        trace!(
            "Removed nucleon {:?} from slot {}. Likelihood: {:.6e}",
            id, slot, self.likelihood
        );
        Ok((nucleon, slot))
    }

    /// Moves a member to `position`, updating the likelihood incrementally.
    ///
    /// While recording, the prior position and likelihood are journaled first. A move that
    /// stays inside the current bin keeps the neighbor set and re-evaluates the existing
    /// factors in place, on both endpoints of every pair. A move into another bin
    /// unregisters the nucleon and registers it again at the same list position.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NucleonNotFound`] for a non-member, or a coordinate or
    /// likelihood error. On error the collection and the journal are unchanged.
    pub fn set_nucleon_position(
        &mut self,
        id: NucleonId,
        position: Point3<f64>,
    ) -> Result<(), CollectionError> {
        let current = self
            .nucleons
            .get(id)
            .ok_or(CollectionError::NucleonNotFound(id))?;
        let position = self.grid.bring_inside_region(position)?;
        let cell = self.grid.find_cube(&position);

        if current.cell == Some(cell) {
            let update = self.evaluate_in_place(current, position)?;
            self.record(id);
            self.apply_in_place(id, update);
        } else {
            let mut probe = current.detached();
            probe.position = position;
            let placement = self.evaluate_placement(Some(id), &probe)?;
            self.record(id);
            let slot = self.unlink(id);
            self.link(id, slot, placement);
        }

        trace!(
            "Moved nucleon {:?} to ({:.4}, {:.4}, {:.4}). Likelihood: {:.6e}",
            id, position.x, position.y, position.z, self.likelihood
        );
        Ok(())
    }

    /// Replaces the nucleon at a list position with the position, identity and radius of
    /// `nucleon`, keeping its id and list position. The change is not journaled.
    pub fn replace(&mut self, index: isize, nucleon: &Nucleon) -> Result<(), CollectionError> {
        let id = self.id_at(index)?;
        let mut probe = nucleon.detached();
        probe.position = self.grid.bring_inside_region(probe.position)?;
        let placement = self.evaluate_placement(Some(id), &probe)?;

        let slot = self.unlink(id);
        let target = &mut self.nucleons[id];
        target.identity = probe.identity;
        target.radius = probe.radius;
        self.link(id, slot, placement);
        Ok(())
    }

    /// Returns detached copies of all members in list order.
    pub fn nucleons(&self) -> Vec<Nucleon> {
        self.iter().map(|(_, nucleon)| nucleon.detached()).collect()
    }

    /// Replaces the whole population with copies of `nucleons`.
    pub fn set_nucleons(&mut self, nucleons: &[Nucleon]) -> Result<(), CollectionError> {
        self.reset();
        for nucleon in nucleons {
            self.add_nucleon(nucleon)?;
        }
        Ok(())
    }

    /// Recomputes the likelihood from the cached factors.
    ///
    /// Single factors are re-evaluated and cached. Walking every member multiplies each
    /// single factor in squared and each pair factor once per endpoint; the square root of
    /// that product counts everything exactly once. This removes floating point drift
    /// accumulated by the incremental updates.
    pub fn update_likelihood(&mut self) -> Result<f64, CollectionError> {
        let singles = self
            .ordered
            .iter()
            .map(|&id| self.evaluate_single(&self.nucleons[id]))
            .collect::<Result<Vec<_>, _>>()?;

        let mut product = 1.0;
        for (&id, single) in self.ordered.iter().zip(singles) {
            let nucleon = &mut self.nucleons[id];
            nucleon.single_likelihood = single;
            product *= single.powi(2);
            for pair in &nucleon.pairwise_likelihoods {
                product *= pair.value;
            }
        }

        let previous = self.likelihood;
        self.likelihood = product.sqrt();
        debug!(
            "Rebuilt likelihood over {} nucleons: {:.12e} (incremental value {:.12e})",
            self.ordered.len(),
            self.likelihood,
            previous
        );
        Ok(self.likelihood)
    }

    /// Removes and drops every member. The likelihood returns to `1` and pending journal
    /// entries are discarded; the recording state is kept.
    pub fn reset(&mut self) {
        self.grid.clear();
        self.nucleons.clear();
        self.ordered.clear();
        self.likelihood = 1.0;
        self.journal.clear();
        debug!("Collection reset.");
    }

    /// Empties the collection and returns its members, detached, in list order.
    pub fn take_nucleons(&mut self) -> Vec<Nucleon> {
        let ordered = std::mem::take(&mut self.ordered);
        let nucleons = ordered
            .into_iter()
            .filter_map(|id| self.nucleons.remove(id))
            .map(|mut nucleon| {
                nucleon.clear_registration();
                nucleon
            })
            .collect();
        self.reset();
        nucleons
    }

    /// Discards the journal, starts recording moves and returns the current likelihood.
    pub fn checkpoint(&mut self) -> f64 {
        self.journal.begin();
        debug!("Checkpoint taken. Likelihood: {:.12e}", self.likelihood);
        self.likelihood
    }

    pub fn is_recording(&self) -> bool {
        self.journal.is_recording()
    }

    /// Undoes every move recorded since the last checkpoint.
    ///
    /// Moves are replayed through [`Self::set_nucleon_position`] with recording suspended,
    /// so bins and cached factors are rebuilt rather than overwritten. The likelihood is
    /// then restored to the exact value it had at the checkpoint and recording resumes.
    /// Does nothing when no moves were recorded.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NucleonNotFound`] without moving anything if a journaled
    /// nucleon has since been removed; the journal is kept. A likelihood error raised while
    /// replaying leaves the earlier replayed moves applied and the journal drained.
    pub fn revert(&mut self) -> Result<f64, CollectionError> {
        if let Some(missing) = self
            .journal
            .entries()
            .iter()
            .find(|entry| !self.nucleons.contains_key(entry.nucleon))
        {
            return Err(CollectionError::NucleonNotFound(missing.nucleon));
        }

        let Some(plan) = self.journal.take_revert_plan() else {
            return Ok(self.likelihood);
        };

        self.journal.set_state(JournalState::Idle);
        let outcome = plan
            .moves
            .iter()
            .try_for_each(|&(id, position)| self.set_nucleon_position(id, position));
        self.journal.set_state(JournalState::Recording);
        outcome?;

        self.likelihood = plan.likelihood;
        debug!(
            "Reverted {} coalesced move(s). Likelihood: {:.12e}",
            plan.moves.len(),
            self.likelihood
        );
        Ok(self.likelihood)
    }

    /// Runs `action` after a checkpoint and reverts its moves if it fails.
    ///
    /// On success the moves stay applied and recording continues, so the caller can still
    /// revert them later. On failure the action's error is returned even if the rollback
    /// itself fails; the rollback error is logged.
    pub fn transaction<F, R>(&mut self, action: F) -> Result<R, CollectionError>
    where
        F: FnOnce(&mut Self) -> Result<R, CollectionError>,
    {
        self.checkpoint();
        match action(self) {
            Ok(result) => Ok(result),
            Err(error) => {
                if let Err(revert_error) = self.revert() {
                    warn!("Failed to roll back a failed transaction: {}", revert_error);
                }
                Err(error)
            }
        }
    }

    fn resolve_index(&self, index: isize) -> Result<usize, CollectionError> {
        let len = self.ordered.len();
        if len == 0 || index >= len as isize {
            return Err(CollectionError::IndexOutOfRange { index, len });
        }
        Ok(index.rem_euclid(len as isize) as usize)
    }

    fn record(&mut self, id: NucleonId) {
        if self.journal.is_recording() {
            let position = self.nucleons[id].position;
            self.journal.record(JournalEntry {
                nucleon: id,
                position,
                likelihood: self.likelihood,
            });
        }
    }

    fn evaluate_single(&self, nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
        let value = self.model.single_likelihood(nucleon)?;
        if !value.is_finite() {
            return Err(LikelihoodError::NonFiniteSingle { value });
        }
        if value == 0.0 {
            warn!("Single-body likelihood is zero; incremental updates are undefined until the nucleon moves away.");
        }
        Ok(value)
    }

    fn evaluate_pair(&self, first: &Nucleon, second: &Nucleon) -> Result<f64, LikelihoodError> {
        let value = self.model.pairwise_likelihood(first, second)?;
        if !value.is_finite() {
            return Err(LikelihoodError::NonFinitePair { value });
        }
        if value == 0.0 {
            warn!("Pairwise likelihood is zero; incremental updates are undefined until the pair separates.");
        }
        Ok(value)
    }

    /// The image of `probe` nearest to `peer`, and the shift that produced it.
    fn nearest_image(&self, peer: &Nucleon, probe: &Nucleon) -> (Vector3<f64>, Nucleon) {
        let box_length = 2.0 * self.config.length;
        let shift = nearest_image_shift(&peer.position, &probe.position, box_length);
        (shift, probe.shifted(&shift))
    }

    /// Evaluates the factors `probe` would have at its (already normalized) position.
    /// `id` names the member being relocated so it is not paired with itself.
    fn evaluate_placement(
        &self,
        id: Option<NucleonId>,
        probe: &Nucleon,
    ) -> Result<Placement, CollectionError> {
        let cell = self.grid.find_cube(&probe.position);
        let single = self.evaluate_single(probe)?;

        let mut pairs = Vec::new();
        if self.pairwise_units > 0 {
            for neighbor in self.grid.neighbor_bins(cell, self.pairwise_units) {
                for &peer in self.grid.bin(neighbor) {
                    if Some(peer) == id {
                        continue;
                    }
                    let stationary = &self.nucleons[peer];
                    let (image_shift, image) = self.nearest_image(stationary, probe);
                    let value = self.evaluate_pair(stationary, &image)?;
                    pairs.push(PairLikelihood {
                        peer,
                        value,
                        image_shift,
                    });
                }
            }
        }

        Ok(Placement {
            position: probe.position,
            cell,
            single,
            pairs,
        })
    }

    fn evaluate_in_place(
        &self,
        nucleon: &Nucleon,
        position: Point3<f64>,
    ) -> Result<InPlaceUpdate, CollectionError> {
        let mut probe = nucleon.detached();
        probe.position = position;
        let single = self.evaluate_single(&probe)?;

        let pairs = nucleon
            .pairwise_likelihoods
            .iter()
            .map(|pair| {
                let stationary = &self.nucleons[pair.peer];
                let (image_shift, image) = self.nearest_image(stationary, &probe);
                Ok((self.evaluate_pair(stationary, &image)?, image_shift))
            })
            .collect::<Result<Vec<_>, LikelihoodError>>()?;

        Ok(InPlaceUpdate {
            position,
            single,
            pairs,
        })
    }

    fn apply_in_place(&mut self, id: NucleonId, update: InPlaceUpdate) {
        let nucleon = &mut self.nucleons[id];
        nucleon.position = update.position;

        self.likelihood /= nucleon.single_likelihood;
        nucleon.single_likelihood = update.single;
        self.likelihood *= update.single;

        let mut refreshed = Vec::with_capacity(update.pairs.len());
        for (pair, (value, image_shift)) in nucleon
            .pairwise_likelihoods
            .iter_mut()
            .zip(update.pairs)
        {
            self.likelihood /= pair.value;
            pair.value = value;
            pair.image_shift = image_shift;
            self.likelihood *= value;
            refreshed.push((pair.peer, value, image_shift));
        }

        for (peer, value, image_shift) in refreshed {
            if let Some(entry) = self.nucleons[peer]
                .pairwise_likelihoods
                .iter_mut()
                .find(|entry| entry.peer == id)
            {
                entry.value = value;
                entry.image_shift = -image_shift;
            }
        }
    }

    /// Registers an id that is already in storage at the evaluated placement.
    fn link(&mut self, id: NucleonId, slot: usize, placement: Placement) {
        let Placement {
            position,
            cell,
            single,
            pairs,
        } = placement;

        self.likelihood *= single;
        for pair in &pairs {
            self.likelihood *= pair.value;
            self.nucleons[pair.peer]
                .pairwise_likelihoods
                .push(PairLikelihood {
                    peer: id,
                    value: pair.value,
                    image_shift: -pair.image_shift,
                });
        }

        let nucleon = &mut self.nucleons[id];
        nucleon.position = position;
        nucleon.cell = Some(cell);
        nucleon.single_likelihood = single;
        nucleon.pairwise_likelihoods = pairs;

        self.grid.bin_mut(cell).push(id);
        self.ordered.insert(slot, id);
    }

    /// Unregisters a member while keeping it in storage. Returns its former list position.
    fn unlink(&mut self, id: NucleonId) -> usize {
        let nucleon = &mut self.nucleons[id];
        let single = nucleon.single_likelihood;
        let pairs = std::mem::take(&mut nucleon.pairwise_likelihoods);
        let cell = nucleon.cell.take();
        nucleon.single_likelihood = 1.0;

        self.likelihood /= single;
        for pair in &pairs {
            self.likelihood /= pair.value;
            if let Some(peer) = self.nucleons.get_mut(pair.peer) {
                if let Some(index) = peer
                    .pairwise_likelihoods
                    .iter()
                    .position(|entry| entry.peer == id)
                {
                    peer.pairwise_likelihoods.remove(index);
                }
            }
        }

        if let Some(cell) = cell {
            let bin = self.grid.bin_mut(cell);
            if let Some(index) = bin.iter().position(|&member| member == id) {
                bin.remove(index);
            }
        }

        match self.ordered.iter().position(|&member| member == id) {
            Some(slot) => {
                self.ordered.remove(slot);
                slot
            }
            None => self.ordered.len(),
        }
    }
}
