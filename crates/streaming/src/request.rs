/// Identifies an image load in a deterministic, stable way.
///
/// The upper 16 bits carry a namespace (one per granule layer) so a single
/// host loader can route completions back to the layer that issued them. The
/// lower 48 bits are the per-namespace sequence number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

const SEQ_BITS: u32 = 48;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;

impl Request {
    pub fn new(namespace: u16, seq: u64) -> Self {
        debug_assert!(seq <= SEQ_MASK, "request sequence overflow");
        Self(((namespace as u64) << SEQ_BITS) | (seq & SEQ_MASK))
    }

    pub fn namespace(self) -> u16 {
        (self.0 >> SEQ_BITS) as u16
    }

    pub fn seq(self) -> u64 {
        self.0 & SEQ_MASK
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.seq())
    }
}

#[cfg(test)]
mod tests {
    use super::Request;

    #[test]
    fn namespace_and_seq_round_trip() {
        let r = Request::new(7, 42);
        assert_eq!(r.namespace(), 7);
        assert_eq!(r.seq(), 42);
        assert_eq!(r.to_string(), "7:42");
        assert!(Request::new(1, 0) > Request::new(0, 999));
    }

    #[test]
    fn widest_namespace_and_seq_stay_apart() {
        let top = Request::new(u16::MAX, (1 << 48) - 1);
        assert_eq!(top.namespace(), u16::MAX);
        assert_eq!(top.seq(), (1 << 48) - 1);
        assert_ne!(Request::new(u16::MAX, 0), Request::new(u16::MAX - 1, 0));
        assert_eq!(Request::new(u16::MAX, 0).namespace(), u16::MAX);
    }
}
