use std::{
    io,
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
};

use threadpool::ThreadPool;

use crate::{serve_stream, App, DEFAULT_MAX_BODY_SIZE};

/// Accepts connections and serves each one on a worker thread.
pub struct Server<'a> {
    thread_pool: ThreadPool,
    max_body_size: u64,
    local_addr: Option<SocketAddr>,
    incoming: Box<dyn Iterator<Item = TcpStream> + 'a>,
}

impl<'a> Server<'a> {
    /// Blocks serving connections for as long as the listener yields them.
    ///
    /// Every connection gets its own clone of `app`.
    pub fn serve<Handle>(self, app: Handle) -> io::Result<()>
    where
        Handle: App,
        Handle: Send + Clone + 'static,
    {
        for conn in self.incoming {
            let app = app.clone();
            let max_body_size = self.max_body_size;
            self.thread_pool.execute(move || {
                let peer = conn.peer_addr().ok();
                if let Err(err) = serve_stream(conn, app, max_body_size) {
                    tracing::warn!(?peer, error = %err, "connection ended with an error");
                }
            });
        }

        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn builder() -> ServerBuilder {
        Default::default()
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Server<'static>> {
        Self::builder().bind(addr)
    }
}

impl From<TcpListener> for Server<'static> {
    fn from(listener: TcpListener) -> Self {
        Server::builder().from_listener(listener)
    }
}

pub struct ServerBuilder {
    max_threads: usize,
    max_body_size: u64,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            max_threads: 512,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerBuilder {
    pub fn max_threads(self, max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            ..self
        }
    }

    /// Requests with larger bodies are answered with `413 Payload Too Large`.
    pub fn max_body_size(self, max_body_size: u64) -> Self {
        Self {
            max_body_size,
            ..self
        }
    }

    pub fn from_connections<'a, T: IntoIterator<Item = TcpStream> + 'a>(
        self,
        conns: T,
    ) -> Server<'a> {
        Server {
            thread_pool: ThreadPool::new(self.max_threads),
            max_body_size: self.max_body_size,
            local_addr: None,
            incoming: Box::new(conns.into_iter()),
        }
    }

    pub fn from_listener(self, listener: TcpListener) -> Server<'static> {
        let local_addr = listener.local_addr().ok();
        Server {
            local_addr,
            ..self.from_connections(TcpAcceptor { listener })
        }
    }

    pub fn bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<Server<'static>> {
        let listener = TcpListener::bind(addr)?;
        Ok(self.from_listener(listener))
    }
}

struct TcpAcceptor {
    listener: TcpListener,
}

impl Iterator for TcpAcceptor {
    type Item = TcpStream;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.listener.accept() {
                Ok((conn, addr)) => {
                    tracing::trace!(%addr, "accepted connection");
                    return Some(conn);
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept connection"),
            }
        }
    }
}
