//! Bin-to-bin migration matrix construction and unfolding.

use crate::dataset::{modules, Dataset};
use crate::registry::BinRegistry;
use crate::tables::MigrationCounts;
use dh_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// N×N migration fraction matrix for one dataset, in registry order.
///
/// `matrix[(reco, true)]` is the fraction of events generated in bin `true`
/// and reconstructed in bin `reco`, so `A_reco = M · A_true`. Built fresh
/// from the current raw tables on every request; the raw tables are
/// immutable snapshots but the asymmetry vector is not, so nothing here is
/// cached.
#[derive(Debug, Clone)]
pub struct MigrationMatrix {
    matrix: DMatrix<f64>,
    names: Vec<String>,
}

impl MigrationMatrix {
    /// Build the matrix from the dataset's `binMigration` tables.
    ///
    /// Row construction runs per true bin: off-diagonal fractions are
    /// `count(i→j) / generated(i)`, the diagonal is the complement clamped
    /// into [0, 1] to absorb floating-point drift. A bin without usable
    /// counts keeps an identity row (no migration information).
    pub fn build(data: &Dataset, registry: &BinRegistry) -> Result<Self> {
        let names: Vec<String> = registry.names().to_vec();
        let n = names.len();
        if n == 0 {
            return Err(Error::Validation("no bins to build a migration matrix from".into()));
        }

        // true-bin rows first, transposed at the end
        let mut fractions = DMatrix::<f64>::zeros(n, n);
        for (i, name) in names.iter().enumerate() {
            let counts = data
                .table(name, modules::BIN_MIGRATION)
                .and_then(MigrationCounts::parse)
                .filter(|c| c.generated > 0.0);
            let Some(counts) = counts else {
                log::warn!("no usable migration counts for bin '{name}'; keeping identity row");
                fractions[(i, i)] = 1.0;
                continue;
            };
            let mut off_diagonal = 0.0;
            for (j, other) in names.iter().enumerate() {
                if j == i {
                    continue;
                }
                let f = counts.fraction_to(other);
                fractions[(i, j)] = f;
                off_diagonal += f;
            }
            fractions[(i, i)] = (1.0 - off_diagonal).clamp(0.0, 1.0);
        }

        Ok(Self { matrix: fractions.transpose(), names })
    }

    /// Bin names in matrix order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The reco-row / true-column matrix.
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Solve `A_true = M⁻¹ · A_reco` for the whole bin vector.
    ///
    /// A singular or near-singular matrix is a typed failure; the caller
    /// must keep the reconstructed values and surface the condition.
    pub fn unfold(&self, reco: &DVector<f64>) -> Result<DVector<f64>> {
        if reco.len() != self.names.len() {
            return Err(Error::Validation(format!(
                "asymmetry vector length {} does not match {} bins",
                reco.len(),
                self.names.len()
            )));
        }
        self.matrix
            .clone()
            .lu()
            .solve(reco)
            .ok_or_else(|| Error::Computation("migration matrix is singular".into()))
    }
}
