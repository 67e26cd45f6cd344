use std::future::Future;
use std::pin::Pin;

// Boxed future returned by every async plugin method
pub type StageFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;
