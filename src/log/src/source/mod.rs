use common_base::iterator::{AsyncIterator, VecIterator};
use common_base::sample::Sample;

pub mod json_lines;

/// RowSource yields samples in timestamp order with a stable column set.
pub trait RowSource: AsyncIterator<Item = Sample> + Send {}

impl<T> RowSource for T where T: AsyncIterator<Item = Sample> + Send {}

/// MemorySource is a row source over samples already in memory.
pub type MemorySource = VecIterator<Sample>;
