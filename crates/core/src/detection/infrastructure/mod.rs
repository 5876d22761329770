pub mod onnx_face_encoder;
pub mod onnx_yolo_detector;
