pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use log::{debug, info, warn};
pub use ndarray::{s, Array1, Array2, Array3, Array4, Axis};
pub use once_cell::sync::Lazy;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt::{self, Debug},
    path::{Path, PathBuf},
    sync::Arc,
};
