pub mod ms3d;
