pub mod fps;
