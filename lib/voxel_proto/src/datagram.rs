//! Datagram (UDP) packet framing: a one-byte type tag followed by a fixed-size payload.

use glam::Vec3;

/// Wire type tag for [`Datagram::EntityUpdate`].
pub const TYPE_ENTITY_UPDATE: u8 = 3;
/// Wire type tag for [`Datagram::KeepAlive`].
pub const TYPE_KEEP_ALIVE: u8 = 4;
/// Wire type tag for [`Datagram::PositionAck`].
pub const TYPE_POSITION_ACK: u8 = 5;
/// Wire type tag for [`Datagram::BlockBreak`].
pub const TYPE_BLOCK_BREAK: u8 = 6;

const MOTION_PAYLOAD_LEN: usize = 4 + 12 + 12 + 4 + 4; // id/ack + pos + vel + yaw + pitch
const ENTITY_UPDATE_LEN: usize = 4 + 12 + 12 + 4 + 4; // playerId:u32, pos, vel, yaw, pitch
const POSITION_ACK_LEN: usize = 4 + 12 + 12 + 4 + 4; // ackSeq:u32, pos, vel, yaw, pitch
const BLOCK_BREAK_LEN: usize = 4 + 4 + 4;

// These are payload lengths only; the 1-byte type tag is prepended separately in `encode`.
static_assertions::const_assert_eq!(ENTITY_UPDATE_LEN, 36);
static_assertions::const_assert_eq!(POSITION_ACK_LEN, 36);
static_assertions::const_assert_eq!(BLOCK_BREAK_LEN, 12);
static_assertions::const_assert_eq!(MOTION_PAYLOAD_LEN, 36);

/// A decoded datagram-channel packet. Unknown type tags are represented as [`Datagram::Unknown`]
/// by the caller (this type only covers the known palette) so they can be logged and dropped
/// without this enum growing a catch-all variant that would make matches non-exhaustive over time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Datagram {
    /// Broadcasts a player's transform and velocity.
    EntityUpdate {
        player_id: u32,
        pos: Vec3,
        vel: Vec3,
        yaw: f32,
        pitch: f32,
    },
    /// An empty keepalive, echoed verbatim by the receiver.
    KeepAlive,
    /// Server-authoritative acknowledgement of a client's position update.
    PositionAck {
        ack_seq: u32,
        pos: Vec3,
        vel: Vec3,
        yaw: f32,
        pitch: f32,
    },
    /// A client-initiated block removal at the given block coordinate.
    BlockBreak { x: i32, y: i32, z: i32 },
}

/// Error decoding a datagram: either an unrecognized type tag or a payload of the wrong size
/// for its tag. Neither is fatal for the channel — the packet is simply logged and dropped.
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum DatagramError {
    #[error("unknown datagram type {0}")]
    UnknownType(u8),
    #[error("datagram type {ty} expected payload of {expected} bytes, got {got}")]
    WrongSize { ty: u8, expected: usize, got: usize },
    #[error("datagram shorter than the 1-byte type tag")]
    Empty,
}

fn write_motion(buf: &mut Vec<u8>, id_or_seq: u32, pos: Vec3, vel: Vec3, yaw: f32, pitch: f32) {
    buf.extend_from_slice(&id_or_seq.to_le_bytes());
    for c in [pos.x, pos.y, pos.z, vel.x, vel.y, vel.z, yaw, pitch] {
        buf.extend_from_slice(&c.to_le_bytes());
    }
}

fn read_motion(body: &[u8]) -> (u32, Vec3, Vec3, f32, f32) {
    let id = u32::from_le_bytes(body[0..4].try_into().unwrap());
    let f = |i: usize| f32::from_le_bytes(body[4 + i * 4..8 + i * 4].try_into().unwrap());
    let pos = Vec3::new(f(0), f(1), f(2));
    let vel = Vec3::new(f(3), f(4), f(5));
    let yaw = f(6);
    let pitch = f(7);
    (id, pos, vel, yaw, pitch)
}

impl Datagram {
    /// Encodes this packet as `type:u8` followed by its fixed payload.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::EntityUpdate {
                player_id,
                pos,
                vel,
                yaw,
                pitch,
            } => {
                let mut buf = Vec::with_capacity(1 + ENTITY_UPDATE_LEN);
                buf.push(TYPE_ENTITY_UPDATE);
                write_motion(&mut buf, player_id, pos, vel, yaw, pitch);
                buf
            }
            Self::KeepAlive => vec![TYPE_KEEP_ALIVE],
            Self::PositionAck {
                ack_seq,
                pos,
                vel,
                yaw,
                pitch,
            } => {
                let mut buf = Vec::with_capacity(1 + POSITION_ACK_LEN);
                buf.push(TYPE_POSITION_ACK);
                write_motion(&mut buf, ack_seq, pos, vel, yaw, pitch);
                buf
            }
            Self::BlockBreak { x, y, z } => {
                let mut buf = Vec::with_capacity(1 + BLOCK_BREAK_LEN);
                buf.push(TYPE_BLOCK_BREAK);
                buf.extend_from_slice(&x.to_le_bytes());
                buf.extend_from_slice(&y.to_le_bytes());
                buf.extend_from_slice(&z.to_le_bytes());
                buf
            }
        }
    }

    /// Decodes a full datagram packet (type tag + payload) received off the UDP socket.
    pub fn decode(packet: &[u8]) -> Result<Self, DatagramError> {
        let (&ty, body) = packet.split_first().ok_or(DatagramError::Empty)?;
        match ty {
            TYPE_ENTITY_UPDATE => {
                expect_len(ty, body, ENTITY_UPDATE_LEN)?;
                let (player_id, pos, vel, yaw, pitch) = read_motion(body);
                Ok(Self::EntityUpdate {
                    player_id,
                    pos,
                    vel,
                    yaw,
                    pitch,
                })
            }
            TYPE_KEEP_ALIVE => {
                expect_len(ty, body, 0)?;
                Ok(Self::KeepAlive)
            }
            TYPE_POSITION_ACK => {
                expect_len(ty, body, POSITION_ACK_LEN)?;
                let (ack_seq, pos, vel, yaw, pitch) = read_motion(body);
                Ok(Self::PositionAck {
                    ack_seq,
                    pos,
                    vel,
                    yaw,
                    pitch,
                })
            }
            TYPE_BLOCK_BREAK => {
                expect_len(ty, body, BLOCK_BREAK_LEN)?;
                let x = i32::from_le_bytes(body[0..4].try_into().unwrap());
                let y = i32::from_le_bytes(body[4..8].try_into().unwrap());
                let z = i32::from_le_bytes(body[8..12].try_into().unwrap());
                Ok(Self::BlockBreak { x, y, z })
            }
            unknown => Err(DatagramError::UnknownType(unknown)),
        }
    }
}

fn expect_len(ty: u8, body: &[u8], expected: usize) -> Result<(), DatagramError> {
    if body.len() != expected {
        return Err(DatagramError::WrongSize {
            ty,
            expected,
            got: body.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_round_trips() {
        let pkt = Datagram::KeepAlive;
        assert_eq!(Datagram::decode(&pkt.encode()).unwrap(), pkt);
    }

    #[test]
    fn entity_update_round_trips() {
        let pkt = Datagram::EntityUpdate {
            player_id: 7,
            pos: Vec3::new(1.0, 2.0, 3.0),
            vel: Vec3::new(0.1, 0.2, 0.3),
            yaw: 1.5,
            pitch: -0.5,
        };
        let encoded = pkt.encode();
        assert_eq!(encoded.len(), 1 + ENTITY_UPDATE_LEN);
        assert_eq!(Datagram::decode(&encoded).unwrap(), pkt);
    }

    #[test]
    fn block_break_round_trips() {
        let pkt = Datagram::BlockBreak { x: -4, y: 70, z: 12 };
        assert_eq!(Datagram::decode(&pkt.encode()).unwrap(), pkt);
    }

    #[test]
    fn unknown_type_is_reported_not_panicking() {
        let packet = [200u8, 1, 2, 3];
        assert_eq!(Datagram::decode(&packet), Err(DatagramError::UnknownType(200)));
    }

    #[test]
    fn wrong_size_payload_is_reported() {
        let packet = [TYPE_BLOCK_BREAK, 0, 0];
        assert!(matches!(Datagram::decode(&packet), Err(DatagramError::WrongSize { .. })));
    }
}
