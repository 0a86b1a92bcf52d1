use super::cell::GridCell;
use super::ids::NucleonId;
use crate::core::utils::geometry;
use crate::core::utils::identifiers::identity_from_name;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::str::FromStr;

/// The particle species carried by a nucleon.
///
/// The collection itself attaches no meaning to the identity; it is exposed so that
/// likelihood models can score different species differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum NucleonIdentity {
    /// No species assigned.
    #[default]
    Unspecified,
    Proton,
    Neutron,
    Antiproton,
    Antineutron,
}

impl NucleonIdentity {
    /// Returns the canonical lowercase name of the identity.
    pub fn name(&self) -> &'static str {
        match self {
            NucleonIdentity::Unspecified => "unspecified",
            NucleonIdentity::Proton => "proton",
            NucleonIdentity::Neutron => "neutron",
            NucleonIdentity::Antiproton => "antiproton",
            NucleonIdentity::Antineutron => "antineutron",
        }
    }

    /// Electric charge in units of the elementary charge.
    pub fn charge(&self) -> i8 {
        match self {
            NucleonIdentity::Proton => 1,
            NucleonIdentity::Antiproton => -1,
            NucleonIdentity::Neutron
            | NucleonIdentity::Antineutron
            | NucleonIdentity::Unspecified => 0,
        }
    }

    pub fn is_antiparticle(&self) -> bool {
        matches!(
            self,
            NucleonIdentity::Antiproton | NucleonIdentity::Antineutron
        )
    }
}

impl fmt::Display for NucleonIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NucleonIdentity {
    type Err = ();

    /// Parses an identity from its canonical name or a common alias such as `p`,
    /// `pbar` or `anti-neutron`. Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `()` if the input does not name a known identity.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        identity_from_name(s).ok_or(())
    }
}

/// A cached pairwise factor shared between two member nucleons.
///
/// Every pair is stored twice, once on each endpoint, and both copies always carry the
/// same `value`. `image_shift` is the periodic offset that places the owning nucleon in
/// the same image of the simulation cube as `peer`; the entry stored on the peer carries
/// the negated offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairLikelihood {
    /// The other endpoint of the pair.
    pub peer: NucleonId,
    /// The pairwise likelihood factor contributed by this pair.
    pub value: f64,
    /// Offset applied to the owning nucleon so that `peer` sees its nearest image.
    pub image_shift: Vector3<f64>,
}

/// A point particle with a position, an identity and a radius.
///
/// A nucleon that is not registered in a collection is a plain value: its position can be
/// changed freely through the setters. Once registered, the collection owns it and only
/// hands out shared references; positions then change exclusively through
/// `NucleonCollection::set_nucleon_position` so that bins and cached factors stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Nucleon {
    /// Cartesian coordinates of the particle.
    pub(crate) position: Point3<f64>,
    /// The species of the particle.
    pub(crate) identity: NucleonIdentity,
    /// The particle radius.
    pub(crate) radius: f64,
    /// The grid bin currently holding the nucleon, `None` while unregistered.
    pub(crate) cell: Option<GridCell>,
    /// The cached single-body likelihood factor.
    pub(crate) single_likelihood: f64,
    /// Cached pairwise factors, one per neighbor within the pairwise reach.
    pub(crate) pairwise_likelihoods: Vec<PairLikelihood>,
}

impl Default for Nucleon {
    fn default() -> Self {
        Self::from_point(Point3::origin())
    }
}

impl Nucleon {
    /// Creates an unregistered nucleon at `(x, y, z)` with an unspecified identity and
    /// zero radius.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_point(Point3::new(x, y, z))
    }

    pub fn from_point(position: Point3<f64>) -> Self {
        Self {
            position,
            identity: NucleonIdentity::default(),
            radius: 0.0,
            cell: None,
            single_likelihood: 1.0,
            pairwise_likelihoods: Vec::new(),
        }
    }

    /// Creates an unregistered nucleon from spherical coordinates.
    ///
    /// # Arguments
    ///
    /// * `r` - Distance from the origin.
    /// * `theta` - Polar angle from the +z axis, in radians.
    /// * `phi` - Azimuthal angle from the +x axis, in radians.
    pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Self {
        Self::from_point(geometry::from_spherical(r, theta, phi))
    }

    pub fn with_identity(mut self, identity: NucleonIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    pub fn set_x(&mut self, x: f64) {
        self.position.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.position.y = y;
    }

    pub fn set_z(&mut self, z: f64) {
        self.position.z = z;
    }

    /// Distance from the origin.
    pub fn r(&self) -> f64 {
        geometry::to_spherical(&self.position).0
    }

    /// Polar angle from the +z axis, in radians.
    pub fn theta(&self) -> f64 {
        geometry::to_spherical(&self.position).1
    }

    /// Azimuthal angle from the +x axis, in radians.
    pub fn phi(&self) -> f64 {
        geometry::to_spherical(&self.position).2
    }

    pub fn set_r(&mut self, r: f64) {
        let (_, theta, phi) = geometry::to_spherical(&self.position);
        self.position = geometry::from_spherical(r, theta, phi);
    }

    pub fn set_theta(&mut self, theta: f64) {
        let (r, _, phi) = geometry::to_spherical(&self.position);
        self.position = geometry::from_spherical(r, theta, phi);
    }

    pub fn set_phi(&mut self, phi: f64) {
        let (r, theta, _) = geometry::to_spherical(&self.position);
        self.position = geometry::from_spherical(r, theta, phi);
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    pub fn identity(&self) -> NucleonIdentity {
        self.identity
    }

    pub fn set_identity(&mut self, identity: NucleonIdentity) {
        self.identity = identity;
    }

    /// The cached single-body factor. Meaningful only while registered.
    pub fn single_likelihood(&self) -> f64 {
        self.single_likelihood
    }

    /// The cached pairwise factors. Empty while unregistered.
    pub fn pairwise_likelihoods(&self) -> &[PairLikelihood] {
        &self.pairwise_likelihoods
    }

    /// The grid bin holding the nucleon, or `None` if it is not registered.
    pub fn cell(&self) -> Option<GridCell> {
        self.cell
    }

    pub fn is_registered(&self) -> bool {
        self.cell.is_some()
    }

    /// Returns an independent, unregistered copy carrying only position, identity and radius.
    pub fn detached(&self) -> Nucleon {
        Nucleon::from_point(self.position)
            .with_identity(self.identity)
            .with_radius(self.radius)
    }

    /// Returns a detached copy displaced by a periodic image offset.
    pub(crate) fn shifted(&self, shift: &Vector3<f64>) -> Nucleon {
        let mut image = self.detached();
        image.position += shift;
        image
    }

    pub(crate) fn clear_registration(&mut self) {
        self.cell = None;
        self.single_likelihood = 1.0;
        self.pairwise_likelihoods.clear();
    }
}
