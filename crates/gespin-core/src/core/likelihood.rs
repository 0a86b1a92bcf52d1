//! Likelihood capability consumed by the nucleon collection.
//!
//! A [`LikelihoodModel`] scores a configuration through two hooks: a single-body factor
//! for each nucleon and a pairwise factor for each pair of nucleons within the pairwise
//! reach of the collection. The global likelihood is the product of all of them. Both hooks
//! default to `1`, so the unit model leaves the likelihood constant.
//!
//! Pairwise factors are evaluated once per pair. The collection passes the nucleon that
//! stays put first and the nearest periodic image of the nucleon being placed second, so
//! models should be symmetric under exchange of their arguments.

use super::models::nucleon::Nucleon;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LikelihoodError {
    #[error("Single-body likelihood evaluated to a non-finite value ({value})")]
    NonFiniteSingle { value: f64 },

    #[error("Pairwise likelihood evaluated to a non-finite value ({value})")]
    NonFinitePair { value: f64 },

    #[error("Likelihood evaluation failed: {0}")]
    Evaluation(String),
}

pub trait LikelihoodModel {
    /// The single-body factor contributed by `nucleon`.
    fn single_likelihood(&self, _nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
        Ok(1.0)
    }

    /// The pairwise factor contributed by `first` and `second`.
    ///
    /// `second` is already shifted into the periodic image nearest to `first`.
    fn pairwise_likelihood(
        &self,
        _first: &Nucleon,
        _second: &Nucleon,
    ) -> Result<f64, LikelihoodError> {
        Ok(1.0)
    }
}

/// The model whose factors are all `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitLikelihood;

impl LikelihoodModel for UnitLikelihood {}

/// Adapts a pair of infallible closures into a [`LikelihoodModel`].
///
/// ```ignore
/// use gespin::core::likelihood::FnLikelihood;
///
/// let model = FnLikelihood::new(|n| 1.0 + n.radius(), |_, _| 1.0);
/// ```
#[derive(Clone)]
pub struct FnLikelihood<S, P> {
    single: S,
    pairwise: P,
}

impl<S, P> FnLikelihood<S, P>
where
    S: Fn(&Nucleon) -> f64,
    P: Fn(&Nucleon, &Nucleon) -> f64,
{
    pub fn new(single: S, pairwise: P) -> Self {
        Self { single, pairwise }
    }
}

impl<S, P> LikelihoodModel for FnLikelihood<S, P>
where
    S: Fn(&Nucleon) -> f64,
    P: Fn(&Nucleon, &Nucleon) -> f64,
{
    fn single_likelihood(&self, nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
        Ok((self.single)(nucleon))
    }

    fn pairwise_likelihood(
        &self,
        first: &Nucleon,
        second: &Nucleon,
    ) -> Result<f64, LikelihoodError> {
        Ok((self.pairwise)(first, second))
    }
}

impl<M: LikelihoodModel + ?Sized> LikelihoodModel for &M {
    fn single_likelihood(&self, nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
        (**self).single_likelihood(nucleon)
    }

    fn pairwise_likelihood(
        &self,
        first: &Nucleon,
        second: &Nucleon,
    ) -> Result<f64, LikelihoodError> {
        (**self).pairwise_likelihood(first, second)
    }
}

impl<M: LikelihoodModel + ?Sized> LikelihoodModel for Box<M> {
    fn single_likelihood(&self, nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
        (**self).single_likelihood(nucleon)
    }

    fn pairwise_likelihood(
        &self,
        first: &Nucleon,
        second: &Nucleon,
    ) -> Result<f64, LikelihoodError> {
        (**self).pairwise_likelihood(first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::nucleon::NucleonIdentity;

    struct ChargeModel;

    impl LikelihoodModel for ChargeModel {
        fn single_likelihood(&self, nucleon: &Nucleon) -> Result<f64, LikelihoodError> {
            match nucleon.identity() {
                NucleonIdentity::Unspecified => {
                    Err(LikelihoodError::Evaluation("identity required".to_string()))
                }
                identity => Ok(2.0 + f64::from(identity.charge())),
            }
        }
    }

    #[test]
    fn unit_model_returns_one_for_everything() {
        let a = Nucleon::new(0.0, 0.0, 0.0);
        let b = Nucleon::new(1.0, 0.0, 0.0);
        assert_eq!(UnitLikelihood.single_likelihood(&a), Ok(1.0));
        assert_eq!(UnitLikelihood.pairwise_likelihood(&a, &b), Ok(1.0));
    }

    #[test]
    fn overriding_one_hook_keeps_the_other_default() {
        let proton = Nucleon::default().with_identity(NucleonIdentity::Proton);
        assert_eq!(ChargeModel.single_likelihood(&proton), Ok(3.0));
        assert_eq!(ChargeModel.pairwise_likelihood(&proton, &proton), Ok(1.0));
    }

    #[test]
    fn model_errors_are_propagated() {
        let result = ChargeModel.single_likelihood(&Nucleon::default());
        assert!(matches!(result, Err(LikelihoodError::Evaluation(_))));
    }

    #[test]
    fn closure_adapter_forwards_to_closures() {
        let model = FnLikelihood::new(|n: &Nucleon| 1.0 + n.x(), |a: &Nucleon, b: &Nucleon| {
            a.x() * b.x()
        });
        let a = Nucleon::new(0.5, 0.0, 0.0);
        let b = Nucleon::new(4.0, 0.0, 0.0);
        assert_eq!(model.single_likelihood(&a), Ok(1.5));
        assert_eq!(model.pairwise_likelihood(&a, &b), Ok(2.0));
    }

    #[test]
    fn boxed_and_borrowed_models_delegate() {
        let boxed: Box<dyn LikelihoodModel> = Box::new(ChargeModel);
        let neutron = Nucleon::default().with_identity(NucleonIdentity::Neutron);
        assert_eq!(boxed.single_likelihood(&neutron), Ok(2.0));
        assert_eq!((&ChargeModel).single_likelihood(&neutron), Ok(2.0));
    }
}
