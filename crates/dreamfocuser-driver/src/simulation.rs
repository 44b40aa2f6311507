//! 模拟设备
//!
//! 以 [`SerialTransport`] 的形式替换真实串口：每个写入的请求帧立即生成一个
//! 校验和正确、操作码回显的响应帧，放入读取缓冲区。调焦器从不处于运动状态。

use dreamfocuser_protocol::{
    EnvironmentFeedback, FRAME_RESERVED, FirmwareVersion, FocuserFrame, Opcode,
    ProtocolError, SENTINEL_BAD_CHECKSUM, SENTINEL_UNKNOWN_COMMAND, i32_to_bytes_be,
};
use dreamfocuser_serial::{SerialError, SerialTransport};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// 模拟的初始位置
pub const SIMULATED_POSITION: i32 = 2000;
/// 模拟温度（°C）
pub const SIMULATED_TEMPERATURE: f64 = 20.0;
/// 模拟湿度（%）
pub const SIMULATED_HUMIDITY: f64 = 1.0;

const SIMULATED_FIRMWARE: FirmwareVersion = FirmwareVersion { major: 1, minor: 0 };

/// 内存中的模拟 DreamFocuser
#[derive(Debug)]
pub struct SimulatedTransport {
    position: i32,
    absolute: bool,
    environment: EnvironmentFeedback,
    firmware: FirmwareVersion,
    pending: VecDeque<u8>,
    closed: bool,
}

impl SimulatedTransport {
    /// # 参数
    /// - `absolute`: 'W' 查询报告的模式
    pub fn new(absolute: bool) -> Self {
        Self {
            position: SIMULATED_POSITION,
            absolute,
            environment: EnvironmentFeedback::from_values(SIMULATED_TEMPERATURE, SIMULATED_HUMIDITY),
            firmware: SIMULATED_FIRMWARE,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    fn respond(&mut self, request: FocuserFrame) -> FocuserFrame {
        let Some(opcode) = request.opcode() else {
            return sentinel(SENTINEL_UNKNOWN_COMMAND);
        };

        let data = match opcode {
            Opcode::MoveAbsolute => {
                self.position = request.payload_i32();
                request.data
            },
            Opcode::Calibrate => {
                self.position = request.payload_i32();
                self.absolute = true;
                request.data
            },
            Opcode::Park => {
                self.position = 0;
                [0; 4]
            },
            Opcode::Stop => [0; 4],
            Opcode::ReadPosition => i32_to_bytes_be(self.position),
            Opcode::IsMoving => [0; 4],
            Opcode::IsAbsolute => [0, 0, 0, u8::from(self.absolute)],
            Opcode::ReadEnvironment => self.environment.to_data(),
            Opcode::MoveAtSpeed => [0, 0, 0, request.low_byte()],
            Opcode::FirmwareVersion => [0, 0, self.firmware.major, self.firmware.minor],
        };

        FocuserFrame::response(opcode, data)
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(true)
    }
}

fn sentinel(code: u8) -> FocuserFrame {
    FocuserFrame {
        command: code,
        data: [0; 4],
        reserved: FRAME_RESERVED,
    }
}

impl SerialTransport for SimulatedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SerialError> {
        if self.closed {
            return Err(SerialError::Closed);
        }

        let response = match FocuserFrame::parse(bytes) {
            Ok(request) => self.respond(request),
            Err(ProtocolError::BadChecksum { .. }) => sentinel(SENTINEL_BAD_CHECKSUM),
            Err(_) => sentinel(SENTINEL_UNKNOWN_COMMAND),
        };
        trace!("Simulator answered '{}'", char::from(response.command));

        self.pending.extend(response.encode());
        Ok(bytes.len())
    }

    fn read(&mut self, len: usize, _timeout: Duration) -> Result<Vec<u8>, SerialError> {
        if self.closed {
            return Err(SerialError::Closed);
        }
        if self.pending.is_empty() {
            return Err(SerialError::Timeout);
        }

        let n = len.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn flush_both(&mut self) -> Result<(), SerialError> {
        if self.closed {
            return Err(SerialError::Closed);
        }
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn name(&self) -> &str {
        "simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamfocuser_protocol::FRAME_LEN;

    fn exchange(sim: &mut SimulatedTransport, opcode: Opcode, payload: i32) -> FocuserFrame {
        sim.write(&FocuserFrame::request(opcode, payload).encode()).unwrap();
        let bytes = sim.read(FRAME_LEN, Duration::from_millis(1)).unwrap();
        FocuserFrame::decode(&bytes).unwrap()
    }

    #[test]
    fn test_initial_readings() {
        let mut sim = SimulatedTransport::new(false);

        assert_eq!(exchange(&mut sim, Opcode::ReadPosition, 0).payload_i32(), 2000);
        assert!(!exchange(&mut sim, Opcode::IsMoving, 0).flag());
        assert!(!exchange(&mut sim, Opcode::IsAbsolute, 0).flag());

        let env = EnvironmentFeedback::try_from(exchange(&mut sim, Opcode::ReadEnvironment, 0))
            .unwrap();
        assert!((env.temperature_celsius() - 20.0).abs() < 1e-9);
        assert!((env.humidity_percent() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_and_calibrate() {
        let mut sim = SimulatedTransport::new(false);

        assert_eq!(exchange(&mut sim, Opcode::MoveAbsolute, -64).payload_i32(), -64);
        assert_eq!(sim.position(), -64);

        assert_eq!(exchange(&mut sim, Opcode::Calibrate, 320).payload_i32(), 320);
        assert_eq!(sim.position(), 320);
        assert!(sim.is_absolute());

        exchange(&mut sim, Opcode::Park, 0);
        assert_eq!(sim.position(), 0);
    }

    #[test]
    fn test_speed_echo_and_version() {
        let mut sim = SimulatedTransport::default();
        assert_eq!(exchange(&mut sim, Opcode::MoveAtSpeed, 0x8A).low_byte(), 0x8A);

        let version = FirmwareVersion::try_from(exchange(&mut sim, Opcode::FirmwareVersion, 0))
            .unwrap();
        assert_eq!(version.to_string(), "1.0");
    }

    #[test]
    fn test_corrupted_request_gets_sentinel() {
        let mut sim = SimulatedTransport::default();
        let mut bytes = FocuserFrame::request(Opcode::ReadPosition, 0).encode();
        bytes[7] ^= 0xFF;
        sim.write(&bytes).unwrap();

        let response = sim.read(FRAME_LEN, Duration::from_millis(1)).unwrap();
        assert_eq!(
            FocuserFrame::decode(&response),
            Err(ProtocolError::DeviceBadChecksum)
        );
    }

    #[test]
    fn test_flush_discards_pending() {
        let mut sim = SimulatedTransport::default();
        sim.write(&FocuserFrame::request(Opcode::ReadPosition, 0).encode()).unwrap();
        sim.flush_both().unwrap();
        assert!(matches!(
            sim.read(FRAME_LEN, Duration::from_millis(1)),
            Err(SerialError::Timeout)
        ));
    }
}
