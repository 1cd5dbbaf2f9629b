use std::sync::mpsc;

/// Producer half of a multi-producer event queue, cloned into input threads.
pub struct EventSender<T> {
    tx: mpsc::Sender<T>,
}

/// Consumer half, owned by the tick loop.
pub struct EventReceiver<T> {
    rx: mpsc::Receiver<T>,
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    pub fn send(&self, event: T) -> Result<(), mpsc::SendError<T>> {
        self.tx.send(event)
    }
}

impl<T> EventReceiver<T> {
    pub fn try_recv(&self) -> Result<T, mpsc::TryRecvError> {
        self.rx.try_recv()
    }

    /// Everything queued so far, without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::TryRecvError;

    use super::channel;

    #[test]
    fn drain_returns_events_in_send_order() {
        let (tx, rx) = channel();
        let other = tx.clone();
        tx.send("stop").expect("send");
        other.send("status").expect("send");

        assert_eq!(rx.drain(), vec!["stop", "status"]);
        assert!(rx.drain().is_empty());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        drop(tx);
        drop(other);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }
}
