pub(crate) mod context;
pub(crate) mod cpu;
pub(crate) mod rendezvous;
pub(crate) mod target;
pub(crate) mod worker;
