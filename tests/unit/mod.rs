mod capacity;
mod forwarding;
mod pipeline;
mod renaming;
