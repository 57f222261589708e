// Copyright @yucwang 2021

pub mod bsdf;
pub mod bvh;
pub mod integrator;
pub mod interaction;
pub mod rng;
pub mod sensor;
pub mod scene;
pub mod scene_loader;
pub mod shape;
pub mod tangent_frame;
