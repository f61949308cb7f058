//! Partial-wave term table.
//!
//! The asymmetry fit extracts twelve modulation amplitudes `b_0..b_11`:
//! three twist-2 terms (L = 1..2, M = 1..L) followed by nine twist-3 terms
//! (L = 0..2, M = -L..L). Each term carries its angular-momentum quantum
//! numbers and the modulation it multiplies in the fit PDF.

/// One partial-wave term of the asymmetry expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwTerm {
    /// Index into the fit parameter vector (`b_<index>`).
    pub index: usize,
    /// Orbital angular momentum L.
    pub l: i32,
    /// Magnetic quantum number M.
    pub m: i32,
    /// Twist order (2 or 3).
    pub twist: i32,
}

/// Number of partial-wave terms in the fit.
pub const N_TERMS: usize = 12;

const TERMS: [PwTerm; N_TERMS] = [
    // twist-2: l = 1..2, m = 1..l
    PwTerm { index: 0, l: 1, m: 1, twist: 2 },
    PwTerm { index: 1, l: 2, m: 1, twist: 2 },
    PwTerm { index: 2, l: 2, m: 2, twist: 2 },
    // twist-3: l = 0..2, m = -l..l
    PwTerm { index: 3, l: 0, m: 0, twist: 3 },
    PwTerm { index: 4, l: 1, m: -1, twist: 3 },
    PwTerm { index: 5, l: 1, m: 0, twist: 3 },
    PwTerm { index: 6, l: 1, m: 1, twist: 3 },
    PwTerm { index: 7, l: 2, m: -2, twist: 3 },
    PwTerm { index: 8, l: 2, m: -1, twist: 3 },
    PwTerm { index: 9, l: 2, m: 0, twist: 3 },
    PwTerm { index: 10, l: 2, m: 1, twist: 3 },
    PwTerm { index: 11, l: 2, m: 2, twist: 3 },
];

/// All twelve terms, in fit-parameter order.
pub fn partial_waves() -> &'static [PwTerm; N_TERMS] {
    &TERMS
}

/// Look up a term by its fit-parameter index.
pub fn term(index: usize) -> Option<&'static PwTerm> {
    TERMS.get(index)
}

/// Associated Legendre factor for (l, m) as it appears in the fit PDF.
fn legendre(l: i32, m: i32) -> &'static str {
    match (l, m.abs()) {
        (0, 0) => "1.0",
        (1, 0) => "cos(th)",
        (1, 1) => "sin(th)",
        (2, 0) => "0.5*(3*cos(th)*cos(th)-1)",
        (2, 1) => "sin(2*th)",
        (2, 2) => "sin(th)*sin(th)",
        _ => "0.0",
    }
}

impl PwTerm {
    /// Fit parameter name, e.g. `b_4`.
    pub fn name(&self) -> String {
        format!("b_{}", self.index)
    }

    /// The azimuthal modulation this amplitude multiplies.
    pub fn modulation(&self) -> String {
        let p = legendre(self.l, self.m);
        match self.twist {
            2 => format!("({p})*sin({m}*phi_h - {m}*phi_R1)", m = self.m),
            _ => format!(
                "({p})*sin({n}*phi_h {s} {ma}*phi_R1)",
                n = 1 - self.m,
                s = if self.m >= 0 { "+" } else { "-" },
                ma = self.m.abs()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_terms_in_order() {
        let terms = partial_waves();
        assert_eq!(terms.len(), 12);
        for (i, t) in terms.iter().enumerate() {
            assert_eq!(t.index, i);
            assert_eq!(t.name(), format!("b_{i}"));
        }
        // three twist-2 terms, nine twist-3
        assert_eq!(terms.iter().filter(|t| t.twist == 2).count(), 3);
        assert_eq!(terms.iter().filter(|t| t.twist == 3).count(), 9);
    }

    #[test]
    fn quantum_numbers() {
        assert_eq!((TERMS[0].l, TERMS[0].m, TERMS[0].twist), (1, 1, 2));
        assert_eq!((TERMS[3].l, TERMS[3].m, TERMS[3].twist), (0, 0, 3));
        assert_eq!((TERMS[7].l, TERMS[7].m, TERMS[7].twist), (2, -2, 3));
        assert_eq!((TERMS[11].l, TERMS[11].m, TERMS[11].twist), (2, 2, 3));
    }

    #[test]
    fn modulation_strings() {
        assert_eq!(TERMS[0].modulation(), "(sin(th))*sin(1*phi_h - 1*phi_R1)");
        assert_eq!(TERMS[3].modulation(), "(1.0)*sin(1*phi_h + 0*phi_R1)");
        assert_eq!(TERMS[4].modulation(), "(sin(th))*sin(2*phi_h - 1*phi_R1)");
    }
}
