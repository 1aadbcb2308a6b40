mod car;
mod road;
mod scene;

pub(crate) use scene::DrivingSim;
