#[async_trait]
pub trait AsyncIterator {
    type Item;
    async fn try_next(&mut self) -> anyhow::Result<Option<Self::Item>>;
}

/// VecIterator drains an owned vector front to back.
pub struct VecIterator<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecIterator<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl<T> AsyncIterator for VecIterator<T>
where
    T: Send,
{
    type Item = T;

    async fn try_next(&mut self) -> anyhow::Result<Option<Self::Item>> {
        Ok(self.items.next())
    }
}
