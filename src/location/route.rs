use std::collections::VecDeque;

use crate::models::Gcj02Position;

pub const DEFAULT_ROUTE_CAPACITY: usize = 1000;

/// Converted route points, oldest first. Once full, each push evicts the
/// oldest point.
#[derive(Debug, Clone)]
pub struct RouteBuffer {
    points: VecDeque<Gcj02Position>,
    capacity: usize,
}

impl Default for RouteBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ROUTE_CAPACITY)
    }
}

impl RouteBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: Gcj02Position) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Gcj02Position> {
        self.points.back()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gcj02Position> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<Gcj02Position> {
        self.iter().copied().collect()
    }
}
