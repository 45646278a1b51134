// Domain layer - Core types shared by every other layer

pub mod model;
