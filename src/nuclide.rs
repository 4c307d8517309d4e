//! Nuclide identity and symbolic parsing.
//!
//! A nuclide is identified by `(Z, A, M)`: atomic number, mass number and
//! metastable-state index. Command-line users normally spell it in the
//! conventional form `"Co-60"` or `"Cs-137m"`, which [`Nuclide::from_str`]
//! parses against the element symbol table.

use crate::error::McaError;
use std::fmt;
use std::str::FromStr;

/// Element symbols indexed by `Z - 1`.
const SYMBOLS: [&str; 103] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr",
];

/// Isotope identity used to parameterize the simulated emission spectrum.
///
/// Immutable; supplied at engine construction and never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nuclide {
    /// Atomic number.
    pub z: u32,
    /// Mass number.
    pub a: u32,
    /// Metastable-state index (0 = ground state).
    pub m: u32,
}

impl Nuclide {
    /// Build a nuclide from explicit `(Z, A, M)` values.
    pub fn new(z: u32, a: u32, m: u32) -> Self {
        Self { z, a, m }
    }

    /// The default calibration source, Co-60.
    pub fn default_source() -> Self {
        Self { z: 27, a: 60, m: 0 }
    }

    /// Element symbol for this nuclide's Z, if known.
    pub fn symbol(&self) -> Option<&'static str> {
        self.z
            .checked_sub(1)
            .and_then(|i| SYMBOLS.get(i as usize))
            .copied()
    }
}

impl fmt::Display for Nuclide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol().unwrap_or("?");
        write!(f, "{}-{}", symbol, self.a)?;
        for _ in 0..self.m {
            write!(f, "m")?;
        }
        Ok(())
    }
}

impl FromStr for Nuclide {
    type Err = McaError;

    /// Parse the conventional `"Co-60"` / `"Cs-137m"` designation.
    ///
    /// A trailing `m` marks the first metastable state, `m2` the second.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || McaError::Nuclide(s.to_string());

        let (symbol, rest) = s.trim().split_once('-').ok_or_else(bad)?;
        let z = SYMBOLS
            .iter()
            .position(|&sym| sym.eq_ignore_ascii_case(symbol))
            .map(|i| i as u32 + 1)
            .ok_or_else(bad)?;

        let (mass, meta) = match rest.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        let a: u32 = mass.parse().map_err(|_| bad())?;

        let m = match meta {
            "" => 0,
            "m" => 1,
            other => {
                let digits = other.strip_prefix('m').ok_or_else(bad)?;
                digits.parse().map_err(|_| bad())?
            }
        };

        Ok(Self { z, a, m })
    }
}
