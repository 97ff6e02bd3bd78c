/// Count of accepted events of an aggregate instance. The first accepted event has sequence number 1.
pub type SequenceNumber = i32;
