//! Publisher client

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::Frame;
use crate::registry::validate_topic_name;

/// Connection to a broker's publisher port
///
/// # Example
/// ```no_run
/// use pobesob::client::PublisherClient;
///
/// # async fn example() -> pobesob::Result<()> {
/// let mut publisher = PublisherClient::connect("127.0.0.1:7070").await?;
/// publisher.publish("weather", "sunny").await?;
/// # Ok(())
/// # }
/// ```
pub struct PublisherClient {
    stream: TcpStream,
}

impl PublisherClient {
    /// Connect to the publisher port
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Send one publish frame
    ///
    /// The topic name is checked locally first; the broker would close the
    /// connection on an invalid one.
    pub async fn publish(&mut self, topic: &str, payload: impl Into<Bytes>) -> Result<()> {
        validate_topic_name(topic)?;
        let frame = Frame::publish(topic, payload);
        self.stream.write_all(&frame.encode()).await?;
        Ok(())
    }

    /// Close the write side, ending the session cleanly
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
