use crate::core::models::nucleon::NucleonIdentity;
use phf::{Map, phf_map};

static IDENTITY_ALIASES: Map<&'static str, NucleonIdentity> = phf_map! {
    "unspecified" => NucleonIdentity::Unspecified,
    "unknown" => NucleonIdentity::Unspecified,
    "none" => NucleonIdentity::Unspecified,
    "proton" => NucleonIdentity::Proton,
    "p" => NucleonIdentity::Proton,
    "neutron" => NucleonIdentity::Neutron,
    "n" => NucleonIdentity::Neutron,
    "antiproton" => NucleonIdentity::Antiproton,
    "anti-proton" => NucleonIdentity::Antiproton,
    "anti_proton" => NucleonIdentity::Antiproton,
    "pbar" => NucleonIdentity::Antiproton,
    "antineutron" => NucleonIdentity::Antineutron,
    "anti-neutron" => NucleonIdentity::Antineutron,
    "anti_neutron" => NucleonIdentity::Antineutron,
    "nbar" => NucleonIdentity::Antineutron,
};

/// Looks up a nucleon identity by name or common alias, ignoring case and surrounding whitespace.
pub fn identity_from_name(name: &str) -> Option<NucleonIdentity> {
    IDENTITY_ALIASES
        .get(name.trim().to_ascii_lowercase().as_str())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_resolve() {
        assert_eq!(identity_from_name("proton"), Some(NucleonIdentity::Proton));
        assert_eq!(identity_from_name("neutron"), Some(NucleonIdentity::Neutron));
        assert_eq!(
            identity_from_name("antiproton"),
            Some(NucleonIdentity::Antiproton)
        );
        assert_eq!(
            identity_from_name("antineutron"),
            Some(NucleonIdentity::Antineutron)
        );
        assert_eq!(
            identity_from_name("unspecified"),
            Some(NucleonIdentity::Unspecified)
        );
    }

    #[test]
    fn aliases_are_case_insensitive_and_trimmed() {
        assert_eq!(identity_from_name(" P "), Some(NucleonIdentity::Proton));
        assert_eq!(identity_from_name("PBAR"), Some(NucleonIdentity::Antiproton));
        assert_eq!(
            identity_from_name("Anti-Neutron"),
            Some(NucleonIdentity::Antineutron)
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(identity_from_name("deuteron"), None);
        assert_eq!(identity_from_name(""), None);
    }
}
