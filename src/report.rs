use rowtrace::TraceError;

pub fn report_error(err: &TraceError) {
    match err {
        TraceError::Image(image::ImageError::IoError(io)) => {
            eprintln!("Could not read or write image: {io}");
        }
        TraceError::Image(image::ImageError::Unsupported(unsupported)) => {
            eprintln!("Unsupported image: {unsupported}");
            eprintln!();
            eprintln!("Input must be a format the `image` crate can decode (PNG, JPEG, BMP, ...).");
        }
        TraceError::SproutInvariantViolated { .. } => {
            eprintln!("{err}");
            eprintln!();
            eprintln!("This is a bug in the tracer; please report it with the input image.");
        }
        _ => {
            eprintln!("{err}");
        }
    }
}
