//! A functionally reduced and-inverter graph (FRAIG) manager.
//!
//! [`FraigMgr`] builds a structurally-hashed AND/inverter circuit and
//! collapses it, as it's built, to one node per distinct Boolean function:
//! bit-parallel simulation finds candidate equivalences cheaply, and a
//! persistent SAT mirror of the graph proves or refutes each candidate.
//!
//! ```rust
//! use fraig::{FraigMgr, SolverKind};
//!
//! let mut mgr = FraigMgr::new(64, SolverKind::Kissat);
//! let a = mgr.make_input();
//! let b = mgr.make_input();
//!
//! let xor_direct = mgr.make_xor(a, b);
//! let or_ab = mgr.make_or(a, b);
//! let and_ab = mgr.make_and(a, b);
//! let xor_via_cover = mgr.make_and(or_ab, and_ab.not());
//!
//! // two structurally different circuits computing the same function
//! // collapse to the same representative node.
//! assert_eq!(
//!     mgr.check_equiv(xor_direct, xor_via_cover),
//!     fraig::SatVerdict::Equivalent
//! );
//! ```

pub mod config;
pub mod equiv;
pub mod external;
pub mod handle;
pub mod mgr;
pub mod node;
pub mod sat;
pub mod sigtable;
pub mod sim;
pub mod strash;

pub mod prelude {
    pub use crate::config::{FraigConfig, SolverKind};
    pub use crate::external::{
        import_subnetwork, make_expr, ExprNode, ExternalNode, ExternalNodeKind, LogicNetwork,
    };
    pub use crate::handle::FraigHandle;
    pub use crate::mgr::{FraigMgr, FraigStats};
    pub use crate::sat::SatVerdict;
}

pub use config::{FraigConfig, SolverKind};
pub use handle::FraigHandle;
pub use mgr::{FraigMgr, FraigStats};
pub use sat::SatVerdict;
